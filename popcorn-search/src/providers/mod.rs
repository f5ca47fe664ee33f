//! Catalog provider implementations.

use std::sync::Arc;

use async_trait::async_trait;
use popcorn_core::{PopcornConfig, RuntimeMode};
use tracing::{info, warn};

use crate::errors::CatalogError;
use crate::types::{MovieDetails, ResultItem};

pub mod development;
pub mod mock;
pub mod omdb;

pub use development::DevelopmentCatalog;
#[cfg(test)]
pub use mock::ScriptedCatalog;
pub use omdb::OmdbCatalog;

/// Trait for movie catalog backends.
///
/// Implementations must be cancel-safe: dropping a returned future aborts
/// the underlying request without side effects.
#[async_trait]
pub trait CatalogProvider: Send + Sync + std::fmt::Debug {
    /// Searches the catalog by title fragment.
    ///
    /// # Errors
    /// - `CatalogError::Transport` - Network connectivity issues
    /// - `CatalogError::Status` - Non-success HTTP status
    /// - `CatalogError::NotFound` - Catalog reported no match
    /// - `CatalogError::Parse` - Malformed response body
    async fn search(&self, term: &str) -> Result<Vec<ResultItem>, CatalogError>;

    /// Fetches the full record for one catalog identifier.
    ///
    /// # Errors
    /// - `CatalogError::Transport` - Network connectivity issues
    /// - `CatalogError::Status` - Non-success HTTP status
    /// - `CatalogError::NotFound` - Unknown identifier
    /// - `CatalogError::Parse` - Malformed response body
    async fn details(&self, imdb_id: &str) -> Result<MovieDetails, CatalogError>;
}

/// Builds the catalog selected by the runtime mode.
///
/// # Errors
/// - `CatalogError::Configuration` - If the remote catalog settings are invalid
pub fn catalog_for(config: &PopcornConfig) -> Result<Arc<dyn CatalogProvider>, CatalogError> {
    match config.mode {
        RuntimeMode::Production => {
            if config.catalog.api_key.is_none() {
                warn!("No catalog API key configured, requests will likely be rejected");
            }
            let catalog = OmdbCatalog::new(&config.catalog)?;
            info!(base_url = %catalog.base_url(), "Using remote catalog");
            Ok(Arc::new(catalog))
        }
        RuntimeMode::Development => {
            info!("Using offline development catalog");
            Ok(Arc::new(DevelopmentCatalog::new()))
        }
    }
}
