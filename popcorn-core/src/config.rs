//! Centralized configuration for Popcorn.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::mode::RuntimeMode;

/// Default catalog endpoint (OMDb).
pub const DEFAULT_CATALOG_URL: &str = "http://www.omdbapi.com/";

/// Central configuration for all Popcorn components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct PopcornConfig {
    pub catalog: CatalogConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub mode: RuntimeMode,
}

/// Remote movie catalog connection settings.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog, queried as `<base>?apikey=..&s=..` or `&i=..`
    pub base_url: String,
    /// API key appended to every request when present
    pub api_key: Option<String>,
    /// Whole-request timeout for catalog calls
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
            user_agent: "popcorn/0.1.0",
        }
    }
}

/// Query controller behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum trimmed length (in characters) before a search is issued, at least 1
    pub min_query_chars: usize,
    /// Quiet period after the last term change before the fetch starts
    pub debounce: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 3,
            debounce: Duration::ZERO,
        }
    }
}

/// Local persistence settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding one JSON document per key
    pub data_dir: PathBuf,
    /// Key the watched list is persisted under
    pub watched_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".popcorn"),
            watched_key: "watched".to_string(),
        }
    }
}

impl PopcornConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Catalog overrides
        if let Ok(url) = std::env::var("POPCORN_CATALOG_URL") {
            config.catalog.base_url = url;
        }

        if let Some(key) = std::env::var("POPCORN_OMDB_API_KEY")
            .ok()
            .or_else(|| std::env::var("OMDB_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
        {
            config.catalog.api_key = Some(key);
        }

        if let Ok(timeout) = std::env::var("POPCORN_REQUEST_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.catalog.request_timeout = Duration::from_secs(seconds);
            }
        }

        // Search overrides
        if let Ok(debounce) = std::env::var("POPCORN_DEBOUNCE_MS") {
            if let Ok(millis) = debounce.parse::<u64>() {
                config.search.debounce = Duration::from_millis(millis);
            }
        }

        if let Ok(min_chars) = std::env::var("POPCORN_MIN_QUERY_CHARS") {
            match parse_min_query_chars(&min_chars) {
                Some(count) => config.search.min_query_chars = count,
                None => warn!(value = %min_chars, "Ignoring invalid POPCORN_MIN_QUERY_CHARS"),
            }
        }

        // Storage overrides
        if let Ok(dir) = std::env::var("POPCORN_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(mode) = std::env::var("POPCORN_MODE") {
            if let Ok(mode) = mode.parse() {
                config.mode = mode;
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Offline catalog, short timeout, and no debounce.
    pub fn for_testing() -> Self {
        Self {
            catalog: CatalogConfig {
                request_timeout: Duration::from_secs(2),
                ..Default::default()
            },
            mode: RuntimeMode::Development,
            ..Default::default()
        }
    }

    /// Path of the JSON document backing the watched list.
    pub fn watched_path(&self) -> PathBuf {
        self.storage
            .data_dir
            .join(format!("{}.json", self.storage.watched_key))
    }
}

/// Zero would let an empty term reach the catalog.
fn parse_min_query_chars(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|count| *count > 0)
}
