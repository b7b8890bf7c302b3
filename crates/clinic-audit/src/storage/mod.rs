//! Durable key-value backends for the serialized record sequence
//!
//! The retention store keeps one blob under one reserved key. Backends only
//! need whole-value `get`/`set`/`remove`; they never see individual records.

mod file;
mod memory;
mod sqlite;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageError;
use std::sync::Arc;

/// Blob store consumed by the retention store
pub trait DurableStorage: Send + Sync {
    /// Read the value under `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; deleting an absent key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Open the backend described by `config`
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn DurableStorage>, StorageError> {
    let storage: Arc<dyn DurableStorage> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::File => Arc::new(FileStorage::new(config.resolved_path())?),
        StorageBackend::Sqlite => {
            Arc::new(SqliteStorage::open(config.resolved_path().join(sqlite::DATABASE_FILE))?)
        }
    };

    tracing::debug!(backend = %config.backend, "Opened audit storage");

    Ok(storage)
}
