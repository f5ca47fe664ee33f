//! Scripted provider implementation for testing.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::{MovieDetails, ResultItem};

#[derive(Debug, Clone)]
struct Script<T> {
    delay: Duration,
    outcome: Result<T, CatalogError>,
}

/// Catalog whose answers and latencies are scripted per term or id.
///
/// Records every call and counts calls that were dropped before they
/// finished, which is how tests observe cancellation.
#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    searches: Mutex<HashMap<String, Script<Vec<ResultItem>>>>,
    details: Mutex<HashMap<String, Script<MovieDetails>>>,
    calls: Mutex<Vec<String>>,
    completed: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Counts the call as cancelled unless it ran to completion.
struct CallGuard<'a> {
    catalog: &'a ScriptedCatalog,
    finished: bool,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        let counter = if self.finished {
            &self.catalog.completed
        } else {
            &self.catalog.cancelled
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn item(id: &str, title: &str, year: &str) -> ResultItem {
    ResultItem {
        id: id.to_string(),
        title: title.to_string(),
        year: year.to_string(),
        poster_url: "url".to_string(),
    }
}

pub fn details(id: &str, title: &str) -> MovieDetails {
    MovieDetails {
        imdb_id: id.to_string(),
        title: title.to_string(),
        year: "2010".to_string(),
        released: None,
        runtime: Some("148 min".to_string()),
        genre: None,
        director: None,
        actors: None,
        plot: None,
        poster_url: None,
        imdb_rating: Some("8.8".to_string()),
        media_type: Some("movie".to_string()),
    }
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(
        &self,
        term: &str,
        delay: Duration,
        outcome: Result<Vec<ResultItem>, CatalogError>,
    ) -> &Self {
        self.searches
            .lock()
            .insert(term.to_string(), Script { delay, outcome });
        self
    }

    pub fn on_details(
        &self,
        imdb_id: &str,
        delay: Duration,
        outcome: Result<MovieDetails, CatalogError>,
    ) -> &Self {
        self.details
            .lock()
            .insert(imdb_id.to_string(), Script { delay, outcome });
        self
    }

    /// Every term or id requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn play<T: Clone>(
        &self,
        key: &str,
        script: Option<Script<T>>,
    ) -> Result<T, CatalogError> {
        self.calls.lock().push(key.to_string());
        let mut guard = CallGuard {
            catalog: self,
            finished: false,
        };

        let script = script.unwrap_or(Script {
            delay: Duration::ZERO,
            outcome: Err(CatalogError::NotFound {
                message: "Movie not found!".to_string(),
            }),
        });

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        guard.finished = true;
        script.outcome
    }
}

#[async_trait]
impl CatalogProvider for ScriptedCatalog {
    async fn search(&self, term: &str) -> Result<Vec<ResultItem>, CatalogError> {
        let script = self.searches.lock().get(term).cloned();
        self.play(term, script).await
    }

    async fn details(&self, imdb_id: &str) -> Result<MovieDetails, CatalogError> {
        let script = self.details.lock().get(imdb_id).cloned();
        self.play(imdb_id, script).await
    }
}
