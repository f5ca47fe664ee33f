//! Error types for catalog access.

use thiserror::Error;

/// Errors that can occur while querying the movie catalog.
///
/// The `Display` text of each variant is what a failed controller shows the
/// user, so `NotFound` renders the catalog's own message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Request never produced a response (connection, DNS, timeout).
    #[error("Something went wrong with fetching movies: {reason}")]
    Transport {
        /// The reason for the transport failure
        reason: String,
    },

    /// Catalog answered with a non-success HTTP status.
    #[error("Something went wrong with fetching movies: HTTP {status}")]
    Status {
        /// The HTTP status code returned
        status: u16,
    },

    /// Catalog reported a logical failure (`Response: "False"`).
    #[error("{message}")]
    NotFound {
        /// The catalog's `Error` text, e.g. "Movie not found!"
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Unexpected catalog response: {reason}")]
    Parse {
        /// The reason for the parse error
        reason: String,
    },

    /// Provider could not be constructed from configuration.
    #[error("Invalid catalog configuration: {reason}")]
    Configuration {
        /// The reason the configuration was rejected
        reason: String,
    },
}

impl CatalogError {
    /// Whether the catalog itself said there is nothing to show.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_displays_catalog_message() {
        let error = CatalogError::NotFound {
            message: "Movie not found!".to_string(),
        };
        assert_eq!(error.to_string(), "Movie not found!");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_status_mentions_code() {
        let error = CatalogError::Status { status: 503 };
        assert_eq!(
            error.to_string(),
            "Something went wrong with fetching movies: HTTP 503"
        );
        assert!(!error.is_not_found());
    }
}
