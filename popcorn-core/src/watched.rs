//! The user's watched collection and its aggregate statistics.
//!
//! The list is owned by the application and changed only through
//! [`WatchedList::add`] and [`WatchedList::remove`]. Every successful
//! mutation is written through to the key-value store; a mutation whose write
//! fails is rolled back so memory and disk never disagree.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::{self, KeyValueStore, StorageError};

/// A rated movie as persisted in the watched list.
///
/// Field names match the stored JSON documents (`imdbID`, `userRating`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedMovie {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub poster: String,
    /// Catalog rating; `None` when the catalog reported "N/A"
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<f64>,
    /// Runtime in minutes
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(rename = "userRating")]
    pub user_rating: u8,
    /// How many times the user changed their mind before committing
    #[serde(rename = "countRatingDecision", default)]
    pub rating_decisions: u32,
    #[serde(rename = "addedAt", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

/// Errors from watched-list operations.
#[derive(Debug, thiserror::Error)]
pub enum WatchedError {
    #[error("'{title}' ({imdb_id}) is already in the watched list")]
    AlreadyWatched { imdb_id: String, title: String },

    #[error("Rating {stars} is outside 1..={max}")]
    InvalidRating { stars: u8, max: u8 },

    #[error("No rating has been chosen")]
    NotRated,

    #[error("Failed to persist watched list: {0}")]
    Storage(#[from] StorageError),
}

/// Aggregate statistics over the watched list.
///
/// Averages only consider entries where the value is known and are `0.0`
/// for an empty list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WatchedSummary {
    pub count: usize,
    pub avg_imdb_rating: f64,
    pub avg_user_rating: f64,
    pub avg_runtime: f64,
}

impl WatchedSummary {
    /// Computes the summary for a slice of entries.
    pub fn from_entries(entries: &[WatchedMovie]) -> Self {
        Self {
            count: entries.len(),
            avg_imdb_rating: average(entries.iter().filter_map(|m| m.imdb_rating)),
            avg_user_rating: average(entries.iter().map(|m| f64::from(m.user_rating))),
            avg_runtime: average(entries.iter().filter_map(|m| m.runtime.map(f64::from))),
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}

/// Looks up the watched record for the currently selected movie.
///
/// Pure function of its inputs; callers recompute it whenever either the
/// selection or the list changes.
pub fn watched_entry<'a>(
    selected_id: Option<&str>,
    watched: &'a [WatchedMovie],
) -> Option<&'a WatchedMovie> {
    let selected_id = selected_id?;
    watched.iter().find(|movie| movie.imdb_id == selected_id)
}

/// Watched movies backed by a key-value store.
#[derive(Debug)]
pub struct WatchedList {
    entries: Vec<WatchedMovie>,
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl WatchedList {
    /// Loads the list stored under `key`, or starts empty.
    pub async fn load(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let entries: Vec<WatchedMovie> = storage::load_or_default(store.as_ref(), &key).await;
        info!(key = %key, count = entries.len(), "Loaded watched list");

        Self {
            entries,
            store,
            key,
        }
    }

    pub fn entries(&self) -> &[WatchedMovie] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, imdb_id: &str) -> Option<&WatchedMovie> {
        watched_entry(Some(imdb_id), &self.entries)
    }

    pub fn summary(&self) -> WatchedSummary {
        WatchedSummary::from_entries(&self.entries)
    }

    /// Appends a movie and persists the list.
    ///
    /// # Errors
    ///
    /// - `WatchedError::AlreadyWatched` - If the id is already present
    /// - `WatchedError::Storage` - If persisting failed; the list is unchanged
    pub async fn add(&mut self, mut movie: WatchedMovie) -> Result<(), WatchedError> {
        if let Some(existing) = self.find(&movie.imdb_id) {
            return Err(WatchedError::AlreadyWatched {
                imdb_id: existing.imdb_id.clone(),
                title: existing.title.clone(),
            });
        }

        if movie.added_at.is_none() {
            movie.added_at = Some(Utc::now());
        }

        let imdb_id = movie.imdb_id.clone();
        self.entries.push(movie);

        if let Err(e) = self.persist().await {
            self.entries.pop();
            return Err(e);
        }

        debug!(imdb_id = %imdb_id, count = self.entries.len(), "Added watched movie");
        Ok(())
    }

    /// Removes the movie with `imdb_id`, returning whether anything changed.
    ///
    /// Nothing is written when the id is absent.
    ///
    /// # Errors
    ///
    /// - `WatchedError::Storage` - If persisting failed; the list is unchanged
    pub async fn remove(&mut self, imdb_id: &str) -> Result<bool, WatchedError> {
        let Some(position) = self.entries.iter().position(|m| m.imdb_id == imdb_id) else {
            return Ok(false);
        };

        let removed = self.entries.remove(position);

        if let Err(e) = self.persist().await {
            self.entries.insert(position, removed);
            return Err(e);
        }

        debug!(imdb_id, count = self.entries.len(), "Removed watched movie");
        Ok(true)
    }

    async fn persist(&self) -> Result<(), WatchedError> {
        storage::save(self.store.as_ref(), &self.key, &self.entries).await?;
        Ok(())
    }
}
