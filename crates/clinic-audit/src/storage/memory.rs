use crate::error::StorageError;
use crate::storage::DurableStorage;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Process-local storage with an optional byte quota
///
/// The quota mimics browser-style storage limits: a `set` whose value is
/// larger than the quota fails and leaves the previous value in place.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values longer than `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota {
            if value.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    needed: value.len(),
                    limit,
                });
            }
        }

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
