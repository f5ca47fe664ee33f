//! Popcorn Core - Shared building blocks for the movie search application
//!
//! Configuration, key-value persistence, the watched collection with its
//! summary statistics, the rating draft, and scoped keyboard shortcuts.
//! Nothing in this crate talks to the catalog; see `popcorn-search`.

pub mod config;
pub mod mode;
pub mod rating;
pub mod shortcuts;
pub mod storage;
pub mod tracing_setup;
pub mod watched;

// Re-export main types for convenient access
pub use config::PopcornConfig;
pub use mode::RuntimeMode;
pub use rating::{MAX_RATING, RatingDraft};
pub use shortcuts::{ShortcutGuard, ShortcutRegistry};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};
pub use watched::{WatchedError, WatchedList, WatchedMovie, WatchedSummary, watched_entry};

/// Errors that can bubble up from any Popcorn subsystem outside the catalog.
#[derive(Debug, thiserror::Error)]
pub enum PopcornError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Watched list error: {0}")]
    Watched(#[from] WatchedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PopcornError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            PopcornError::Watched(e) => match e {
                WatchedError::AlreadyWatched { title, .. } => {
                    format!("You already rated {title}")
                }
                WatchedError::InvalidRating { stars, max } => {
                    format!("Rating must be between 1 and {max}, got {stars}")
                }
                WatchedError::NotRated => "Pick a rating before adding the movie".to_string(),
                WatchedError::Storage(_) => "Could not save the watched list".to_string(),
            },
            PopcornError::Storage(_) => "Storage error occurred".to_string(),
            PopcornError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PopcornError::Watched(
                    WatchedError::AlreadyWatched { .. }
                        | WatchedError::InvalidRating { .. }
                        | WatchedError::NotRated
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_classified() {
        let rating = PopcornError::from(WatchedError::InvalidRating { stars: 11, max: 10 });
        assert!(rating.is_user_error());
        assert_eq!(rating.user_message(), "Rating must be between 1 and 10, got 11");

        let io = PopcornError::from(std::io::Error::other("disk gone"));
        assert!(!io.is_user_error());
        assert_eq!(io.user_message(), "File system error occurred");
    }
}
