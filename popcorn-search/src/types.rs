//! Data types for catalog results and controller state.

use popcorn_core::{RatingDraft, WatchedError, WatchedMovie};
use serde::{Deserialize, Serialize};

/// One catalog entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster_url: String,
}

/// Full catalog record for a single movie.
///
/// Fields the catalog reports as "N/A" are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub released: Option<String>,
    /// Raw runtime string such as "148 min"
    pub runtime: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    /// Raw rating string such as "8.8"
    pub imdb_rating: Option<String>,
    pub media_type: Option<String>,
}

impl MovieDetails {
    /// Runtime in whole minutes, parsed from the leading number of "<N> min".
    pub fn runtime_minutes(&self) -> Option<u32> {
        self.runtime
            .as_deref()?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    }

    /// Catalog rating as a number.
    pub fn imdb_rating_value(&self) -> Option<f64> {
        self.imdb_rating.as_deref()?.trim().parse().ok()
    }

    /// Builds the watched-list record for this movie from a finished draft.
    ///
    /// # Errors
    ///
    /// - `WatchedError::NotRated` - If the draft has no rating yet
    pub fn to_watched(&self, draft: &RatingDraft) -> Result<WatchedMovie, WatchedError> {
        let user_rating = draft.rating().ok_or(WatchedError::NotRated)?;

        Ok(WatchedMovie {
            imdb_id: self.imdb_id.clone(),
            title: self.title.clone(),
            year: self.year.clone(),
            poster: self.poster_url.clone().unwrap_or_default(),
            imdb_rating: self.imdb_rating_value(),
            runtime: self.runtime_minutes(),
            user_rating,
            rating_decisions: draft.decisions(),
            added_at: None,
        })
    }
}

/// Monotonic marker of one request attempt.
///
/// Each new request or reset mints the next value; a response tagged with
/// anything but the current generation is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestGeneration(u64);

impl RequestGeneration {
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

}

impl std::fmt::Display for RequestGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observable state of a request lifecycle.
///
/// Loading carries no payload: starting a request clears previous results
/// and errors, so loading, data and error are never shown together.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    /// Nothing to fetch (term too short, nothing selected)
    Idle,
    /// Request in flight
    Loading,
    /// Latest request succeeded
    Ready(T),
    /// Latest request failed
    Failed { message: String },
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> FetchState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// True once the latest request has succeeded or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed { .. })
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// State published by the search controller.
pub type ControllerState = FetchState<Vec<ResultItem>>;

/// State published by the detail controller.
pub type DetailState = FetchState<MovieDetails>;

impl ControllerState {
    /// Current results; empty unless the state is `Ready`.
    pub fn results(&self) -> &[ResultItem] {
        self.ready().map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> MovieDetails {
        MovieDetails {
            imdb_id: "tt1375666".to_string(),
            title: "Inception".to_string(),
            year: "2010".to_string(),
            released: Some("16 Jul 2010".to_string()),
            runtime: Some("148 min".to_string()),
            genre: Some("Action, Adventure, Sci-Fi".to_string()),
            director: Some("Christopher Nolan".to_string()),
            actors: Some("Leonardo DiCaprio, Joseph Gordon-Levitt".to_string()),
            plot: None,
            poster_url: Some("https://example.com/inception.jpg".to_string()),
            imdb_rating: Some("8.8".to_string()),
            media_type: Some("movie".to_string()),
        }
    }

    #[test]
    fn test_runtime_and_rating_parsing() {
        let mut details = inception();
        assert_eq!(details.runtime_minutes(), Some(148));
        assert_eq!(details.imdb_rating_value(), Some(8.8));

        details.runtime = Some("unknown".to_string());
        details.imdb_rating = None;
        assert_eq!(details.runtime_minutes(), None);
        assert_eq!(details.imdb_rating_value(), None);
    }

    #[test]
    fn test_to_watched_requires_rating() {
        let details = inception();
        let mut draft = RatingDraft::new();
        assert!(matches!(
            details.to_watched(&draft),
            Err(WatchedError::NotRated)
        ));

        draft.set_rating(7).unwrap();
        draft.set_rating(10).unwrap();
        let watched = details.to_watched(&draft).unwrap();

        assert_eq!(watched.imdb_id, "tt1375666");
        assert_eq!(watched.user_rating, 10);
        assert_eq!(watched.rating_decisions, 2);
        assert_eq!(watched.runtime, Some(148));
        assert_eq!(watched.imdb_rating, Some(8.8));
        assert_eq!(watched.poster, "https://example.com/inception.jpg");
    }

    #[test]
    fn test_state_accessors() {
        let ready: ControllerState = FetchState::Ready(vec![ResultItem {
            id: "tt1".to_string(),
            title: "One".to_string(),
            year: "2001".to_string(),
            poster_url: "N/A".to_string(),
        }]);
        assert!(ready.is_settled());
        assert_eq!(ready.results().len(), 1);

        let failed: ControllerState = FetchState::Failed {
            message: "Movie not found!".to_string(),
        };
        assert_eq!(failed.error(), Some("Movie not found!"));
        assert!(failed.results().is_empty());
        assert!(!ControllerState::Loading.is_settled());
        assert!(ControllerState::default().is_idle());
    }
}
