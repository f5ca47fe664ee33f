//! Durable key-value storage for application state.
//!
//! Values are JSON documents addressed by short string keys. The watched
//! list is the main tenant: it is loaded once at startup with
//! [`load_or_default`] and written back with [`save`] after every mutation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};

const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Raw string storage keyed by name.
///
/// Implementations must make `set` all-or-nothing: a reader never observes a
/// half-written value.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Reads the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidKey` - If the key cannot be used as a storage name
    /// - `StorageError::Io` - If the backing medium could not be read
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidKey` - If the key cannot be used as a storage name
    /// - `StorageError::Io` - If the backing medium could not be written
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Errors that occur while persisting application state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Key is empty or contains characters unusable in a file name
    #[error("Invalid storage key: '{key}'")]
    InvalidKey {
        /// The rejected key
        key: String,
    },

    /// Value could not be encoded as JSON
    #[error("Serialization failed for '{key}': {reason}")]
    Serialization {
        /// Key being written
        key: String,
        /// Encoder error description
        reason: String,
    },

    /// Standard I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads and decodes the value under `key`, falling back to `T::default()`.
///
/// A missing key is the normal first-run case. Unreadable or undecodable
/// documents are logged and also yield the default.
pub async fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Stored value is not valid, using default");
                T::default()
            }
        },
        Ok(None) => {
            debug!(key, "Nothing stored yet, using default");
            T::default()
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored value, using default");
            T::default()
        }
    }
}

/// Encodes `value` as JSON and stores it under `key`.
///
/// # Errors
///
/// - `StorageError::Serialization` - If the value cannot be encoded
/// - Any error returned by the store's `set`
pub async fn save<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, &raw).await
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let usable = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if usable {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// File system store writing `<root>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let temp_path = self.root.join(format!("{key}.json{TEMP_FILE_SUFFIX}"));

        fs::create_dir_all(&self.root).await?;
        fs::write(&temp_path, value).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(key, path = %path.display(), bytes = value.len(), "Stored value");
        Ok(())
    }
}

/// Process-local store used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.values.lock().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        volume: u8,
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("state"));

        let prefs = Prefs {
            theme: "dark".to_string(),
            volume: 7,
        };
        save(&store, "prefs", &prefs).await.unwrap();

        let loaded: Prefs = load_or_default(&store, "prefs").await;
        assert_eq!(loaded, prefs);
        assert!(temp_dir.path().join("state/prefs.json").exists());
        assert!(!temp_dir.path().join("state/prefs.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_key_yields_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let loaded: Prefs = load_or_default(&store, "prefs").await;
        assert_eq!(loaded, Prefs::default());
    }

    #[tokio::test]
    async fn test_corrupt_document_yields_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("prefs.json"), "{not json").unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let loaded: Prefs = load_or_default(&store, "prefs").await;
        assert_eq!(loaded, Prefs::default());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let store = JsonFileStore::new("/tmp");

        let result = store.set("../escape", "{}").await;
        assert!(matches!(result, Err(StorageError::InvalidKey { .. })));
        assert!(matches!(
            store.get("").await,
            Err(StorageError::InvalidKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_store_counts_writes() {
        let store = MemoryStore::new();
        assert_eq!(store.write_count(), 0);

        save(&store, "watched", &vec![1, 2, 3]).await.unwrap();
        save(&store, "watched", &vec![1]).await.unwrap();

        let loaded: Vec<u32> = load_or_default(&store, "watched").await;
        assert_eq!(loaded, vec![1]);
        assert_eq!(store.write_count(), 2);
    }
}
