//! Local persistence for the offline queue
//!
//! Storage is modeled as a small key-value interface so the queue does not
//! care where its blob lives. Three backends are provided:
//!
//! - [`SqliteStore`] - a `kv_store` table in a SQLite database (default)
//! - [`FileStore`] - one JSON file per key, written via temp file + rename
//! - [`MemoryStore`] - shared in-process map, for tests and ephemeral sessions

pub mod file;
pub mod memory;
pub mod queue;
pub mod sqlite;

use std::path::Path;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use queue::DurableQueue;
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};

/// Errors raised by persistence backends
///
/// A storage failure right after a rejected remote submit is the one path
/// that can lose a record, so it is kept distinct from remote errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Persisted blob could not be encoded or decoded
    #[error("Corrupt queue blob under key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend lock was poisoned by a panicking writer
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal key-value persistence scoped to this device
///
/// Every method is synchronous and must be durable when it returns `Ok`.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the blob stored under `key`
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Open the backend selected in configuration
pub fn open_store(config: &StorageConfig) -> StorageResult<Box<dyn KeyValueStore>> {
    let store: Box<dyn KeyValueStore> = match config.backend {
        StorageBackend::Sqlite => Box::new(SqliteStore::open(&config.path)?),
        StorageBackend::File => Box::new(FileStore::new(&config.path)?),
        StorageBackend::Memory => Box::new(MemoryStore::new()),
    };

    tracing::debug!(
        backend = ?config.backend,
        path = %config.path.display(),
        "Opened local store"
    );
    Ok(store)
}
