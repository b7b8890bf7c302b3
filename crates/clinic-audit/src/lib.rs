//! Clinic Audit Library
//!
//! Audit trail for a clinic data manager: every completed mutating operation
//! leaves an immutable event record behind.
//!
//! # Overview
//!
//! - **Records**: Immutable events with actor, action, entity and details
//! - **Retention**: Bounded append-only store with FIFO eviction, persisted
//!   after every append to a durable key-value backend (file, SQLite, memory)
//! - **Interception**: [`AuditLayer`] decorates named data manager operations
//!   so successful calls are recorded without touching call sites
//! - **Queries**: Conjunctive filters over actor, entity, action and time,
//!   always newest first
//! - **Export**: CSV and JSON artifacts named `audit-log-<date>.<ext>`
//! - **Notifications**: Broadcast feed of appended records
//!
//! # Commands and queries
//!
//! Only mutations are audited, plus exports of the trail itself. Reading the
//! trail is not.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use clinic_audit::{AuditAction, AuditQuery, AuditTrail, MemoryStorage, RecordDraft};
//!
//! let trail = AuditTrail::new(Arc::new(MemoryStorage::new()));
//! trail.record(RecordDraft::new(AuditAction::Create, "patient").entity_id("p-1"), None);
//!
//! let creates = trail.query(&AuditQuery::new().action(AuditAction::Create));
//! assert_eq!(creates.len(), 1);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod collaborator;
pub mod config;
pub mod error;
pub mod export;
pub mod logger;
pub mod notify;
pub mod origin;
pub mod pagination;
pub mod query;
pub mod record;
pub mod storage;
pub mod store;
pub mod tracking;
pub mod trail;

// Re-export commonly used types
pub use collaborator::{
    ready_channel, Collaborator, DataManager, OperationError, OperationRegistry, OperationResult,
    PendingCollaborator, ReadyPublisher, SessionSource,
};
pub use config::{AuditConfig, StorageBackend, StorageConfig};
pub use error::{AuditError, Result, StorageError};
pub use export::{ExportArtifact, ExportFormat};
pub use logger::AuditLogger;
pub use notify::AuditNotifier;
pub use origin::Origin;
pub use pagination::{paginate, Page};
pub use query::{query, AuditQuery, RawFilters};
pub use record::{Actor, AuditAction, DetailValue, Details, EventRecord, RecordDraft};
pub use storage::{open_storage, DurableStorage, FileStorage, MemoryStorage, SqliteStorage};
pub use store::{AppendReceipt, RetentionStore};
pub use tracking::{AuditLayer, Invocation, TrackSpec};
pub use trail::AuditTrail;
