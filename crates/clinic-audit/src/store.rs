//! Bounded, append-only record retention
//!
//! The in-memory sequence is authoritative. Durable storage receives the
//! whole sequence after every append; when that write fails the store keeps
//! working from memory and retries on the next append.

use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::config::{DEFAULT_RETENTION_CEILING, DEFAULT_STORAGE_KEY};
use crate::error::Result;
use crate::record::EventRecord;
use crate::storage::DurableStorage;

/// Outcome of one [`RetentionStore::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Oldest records dropped to stay under the ceiling
    pub evicted: usize,
    /// Whether the full sequence reached durable storage
    pub persisted: bool,
    /// Records retained after the append
    pub retained: usize,
}

#[derive(Default)]
struct StoreState {
    /// `None` until the durable blob has been read
    records: Option<VecDeque<EventRecord>>,
    /// Last durable write failed
    degraded: bool,
}

/// Append-only record sequence with FIFO eviction past a ceiling
pub struct RetentionStore {
    storage: Arc<dyn DurableStorage>,
    key: String,
    ceiling: usize,
    state: Mutex<StoreState>,
}

impl RetentionStore {
    /// Store with the default key and a ceiling of at least one record
    pub fn new(storage: Arc<dyn DurableStorage>, ceiling: usize) -> Self {
        Self {
            storage,
            key: DEFAULT_STORAGE_KEY.to_string(),
            ceiling: ceiling.max(1),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn with_default_ceiling(storage: Arc<dyn DurableStorage>) -> Self {
        Self::new(storage, DEFAULT_RETENTION_CEILING)
    }

    /// Use a different reserved key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records from the durable blob; empty when missing or unreadable
    fn read_blob(&self) -> VecDeque<EventRecord> {
        let blob = match self.storage.get(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return VecDeque::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Audit history unavailable, starting empty");
                return VecDeque::new();
            },
        };

        let entries: Vec<JsonValue> = match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Audit history is corrupt, starting empty");
                return VecDeque::new();
            },
        };

        // One unreadable entry must not cost the rest of the history
        let total = entries.len();
        let mut records: VecDeque<EventRecord> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable audit record");
                    None
                },
            })
            .collect();

        let skipped = total - records.len();
        if skipped > 0 {
            warn!(key = %self.key, skipped, "Skipped unreadable audit records");
        }

        let excess = records.len().saturating_sub(self.ceiling);
        records.drain(..excess);

        debug!(key = %self.key, count = records.len(), dropped = excess, "Loaded audit history");
        records
    }

    fn loaded<'a>(&self, state: &'a mut StoreState) -> &'a mut VecDeque<EventRecord> {
        state.records.get_or_insert_with(|| self.read_blob())
    }

    /// Read durable history if that has not happened yet; returns the
    /// number of retained records.
    pub fn load(&self) -> usize {
        let mut state = self.lock();
        self.loaded(&mut state).len()
    }

    /// Append `record`, evict past the ceiling, and persist.
    ///
    /// Never fails: a durable write error is logged and the in-memory
    /// sequence stays authoritative.
    pub fn append(&self, record: EventRecord) -> AppendReceipt {
        let mut state = self.lock();
        let records = self.loaded(&mut state);

        records.push_back(record);
        let evicted = records.len().saturating_sub(self.ceiling);
        records.drain(..evicted);
        let retained = records.len();

        let persisted = match self.persist(records) {
            Ok(()) => true,
            Err(e) => {
                if !state.degraded {
                    warn!(
                        key = %self.key,
                        error = %e,
                        "Audit history could not be persisted, continuing in memory"
                    );
                }
                false
            },
        };

        if persisted && state.degraded {
            debug!(key = %self.key, "Audit history persisted again");
        }
        state.degraded = !persisted;

        debug!(evicted, retained, persisted, "Appended audit record");

        AppendReceipt {
            evicted,
            persisted,
            retained,
        }
    }

    fn persist(&self, records: &VecDeque<EventRecord>) -> Result<()> {
        let blob = serde_json::to_string(records)?;
        self.storage.set(&self.key, &blob)?;
        Ok(())
    }

    /// Owned copy of the retained records in insertion order
    pub fn all(&self) -> Vec<EventRecord> {
        let mut state = self.lock();
        self.loaded(&mut state).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.load()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the last durable write failed
    pub fn is_degraded(&self) -> bool {
        self.lock().degraded
    }

    /// Drop every record in durable storage, then in memory
    ///
    /// When the durable delete fails nothing is dropped, so memory and
    /// storage still agree.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        self.storage.remove(&self.key)?;
        state.records = Some(VecDeque::new());
        state.degraded = false;
        debug!(key = %self.key, "Cleared audit history");
        Ok(())
    }
}
