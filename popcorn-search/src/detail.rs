//! Detail controller for the selected catalog entry.

use std::sync::Arc;

use popcorn_core::{WatchedMovie, watched_entry};
use tokio::sync::watch;
use tracing::debug;

use crate::lifecycle::FetchLifecycle;
use crate::providers::CatalogProvider;
use crate::types::{DetailState, MovieDetails, RequestGeneration};

/// Fetches details for whichever identifier is currently selected.
///
/// Same lifecycle as the search controller, keyed by an optional id instead
/// of a term. There is no length gate: a blank id counts as no selection.
#[derive(Debug)]
pub struct DetailController {
    provider: Arc<dyn CatalogProvider>,
    lifecycle: FetchLifecycle<MovieDetails>,
    selected: Option<String>,
}

impl DetailController {
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self {
            provider,
            lifecycle: FetchLifecycle::new("details"),
            selected: None,
        }
    }

    /// Selects `imdb_id`, or clears the selection with `None`.
    ///
    /// Re-selecting the current id is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if a request has to start outside a Tokio runtime.
    pub fn select(&mut self, imdb_id: Option<&str>) {
        let imdb_id = imdb_id.map(str::trim).filter(|id| !id.is_empty());
        if imdb_id == self.selected.as_deref() && (imdb_id.is_some() || self.state().is_idle()) {
            return;
        }

        match imdb_id {
            None => {
                self.selected = None;
                self.lifecycle.reset();
            }
            Some(id) => {
                let id = id.to_string();
                self.selected = Some(id.clone());
                self.issue(id);
            }
        }
    }

    /// Opens `imdb_id`, or closes it when it is already open.
    pub fn toggle(&mut self, imdb_id: &str) {
        if self.selected.as_deref() == Some(imdb_id.trim()) {
            self.close();
        } else {
            self.select(Some(imdb_id));
        }
    }

    pub fn close(&mut self) {
        self.select(None);
    }

    /// Re-fetches the selected entry. Does nothing without a selection.
    pub fn refresh(&mut self) {
        if let Some(id) = self.selected.clone() {
            self.issue(id);
        }
    }

    fn issue(&mut self, imdb_id: String) {
        let provider = Arc::clone(&self.provider);
        let request = imdb_id.clone();
        let generation = self
            .lifecycle
            .start(std::time::Duration::ZERO, async move {
                provider.details(&request).await
            });
        debug!(imdb_id, %generation, "Detail lookup issued");
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Watched record for the selected id, if the user already rated it.
    pub fn rated_entry<'a>(&self, watched: &'a [WatchedMovie]) -> Option<&'a WatchedMovie> {
        watched_entry(self.selected.as_deref(), watched)
    }

    pub fn state(&self) -> DetailState {
        self.lifecycle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.lifecycle.subscribe()
    }

    pub fn generation(&self) -> RequestGeneration {
        self.lifecycle.generation()
    }

    /// Cancels the pending lookup, leaving the last published state as is.
    ///
    /// The selection is dropped too, so selecting the same id afterwards
    /// starts a fresh lookup.
    pub fn shutdown(&mut self) {
        self.lifecycle.cancel();
        self.selected = None;
    }
}
