//! Audit trail facade
//!
//! Owns the retention store, the notification channel and the origin stamp.
//! Applications construct one at startup and hand it to the interception
//! layer as an [`AuditLogger`].

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::error::Result;
use crate::export::{self, ExportArtifact, ExportFormat};
use crate::logger::AuditLogger;
use crate::notify::AuditNotifier;
use crate::origin::Origin;
use crate::query::AuditQuery;
use crate::record::{Actor, AuditAction, EventRecord, RecordDraft};
use crate::storage::{open_storage, DurableStorage};
use crate::store::{AppendReceipt, RetentionStore};

/// Entity type of the records that exports leave behind
pub const EXPORT_ENTITY: &str = "audit_log";

/// Store, notifier and origin behind one handle
pub struct AuditTrail {
    store: RetentionStore,
    notifier: AuditNotifier,
    origin: Origin,
    audit_exports: bool,
}

impl AuditTrail {
    /// Trail over `storage` with default settings
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_store(RetentionStore::with_default_ceiling(storage))
    }

    pub fn with_store(store: RetentionStore) -> Self {
        Self {
            store,
            notifier: AuditNotifier::default(),
            origin: Origin::detect(None),
            audit_exports: true,
        }
    }

    /// Open the configured backend and build a trail over it
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        config.validate()?;
        let storage = open_storage(&config.storage)?;
        let store =
            RetentionStore::new(storage, config.ceiling).with_key(config.storage_key.clone());

        info!(
            backend = %config.storage.backend,
            ceiling = config.ceiling,
            "Audit trail ready"
        );

        Ok(Self {
            store,
            notifier: AuditNotifier::new(config.notify_capacity),
            origin: Origin::detect(None),
            audit_exports: config.audit_exports,
        })
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_export_auditing(mut self, enabled: bool) -> Self {
        self.audit_exports = enabled;
        self
    }

    /// Log an event directly, outside any tracked operation
    pub fn record(&self, draft: RecordDraft, actor: Option<Actor>) -> EventRecord {
        let record = draft.into_record(actor, self.origin.clone());
        self.append(record.clone());
        record
    }

    /// Retain `record` and notify listeners
    pub fn append(&self, record: EventRecord) -> AppendReceipt {
        let receipt = self.store.append(record.clone());
        let delivered = self.notifier.publish(&record);
        debug!(
            id = %record.id(),
            action = %record.action(),
            listeners = delivered,
            "Audit event published"
        );
        receipt
    }

    /// Live feed of appended records
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.notifier.subscribe()
    }

    /// Matching records, newest first. Reads are not audited.
    pub fn query(&self, query: &AuditQuery) -> Vec<EventRecord> {
        let results = query.apply(self.store.all());
        debug!(matched = results.len(), "Queried audit trail");
        results
    }

    /// Render matching records and, when enabled, log the export itself
    ///
    /// The export record is appended after rendering, so it never appears in
    /// its own artifact.
    pub fn export(
        &self,
        query: &AuditQuery,
        format: ExportFormat,
        actor: Option<Actor>,
    ) -> Result<ExportArtifact> {
        let records = self.query(query);
        let artifact = export::export(&records, format)?;

        if self.audit_exports {
            self.record(
                RecordDraft::new(AuditAction::Export, EXPORT_ENTITY)
                    .detail("format", format.as_str())
                    .detail("recordCount", artifact.record_count)
                    .detail("filename", artifact.filename.clone()),
                actor,
            );
        }

        Ok(artifact)
    }

    pub fn store(&self) -> &RetentionStore {
        &self.store
    }

    /// Full reset of retained and durable history
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        info!("Audit trail cleared");
        Ok(())
    }
}

impl AuditLogger for AuditTrail {
    fn log_event(&self, record: EventRecord) -> AppendReceipt {
        self.append(record)
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::storage::MemoryStorage;

    fn trail() -> AuditTrail {
        AuditTrail::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_record_stamps_origin() {
        let trail = trail().with_origin(Origin::default().with_agent("tests"));
        let record = trail.record(RecordDraft::new(AuditAction::Login, "session"), None);

        assert_eq!(record.origin().agent.as_deref(), Some("tests"));
        assert_eq!(trail.store().len(), 1);
    }

    #[tokio::test]
    async fn test_append_notifies_subscribers() {
        let trail = trail();
        let mut rx = trail.subscribe();

        let record = trail.record(RecordDraft::new(AuditAction::Create, "patient"), None);
        assert_eq!(rx.recv().await.unwrap(), record);
    }

    #[test]
    fn test_export_is_audited_after_rendering() {
        let trail = trail();
        trail.record(RecordDraft::new(AuditAction::Create, "patient"), None);

        let artifact = trail
            .export(&AuditQuery::new(), ExportFormat::Csv, Some(Actor::new("u1", "Ada", "admin")))
            .unwrap();
        assert_eq!(artifact.record_count, 1);

        let exports = trail.query(&AuditQuery::new().action(AuditAction::Export));
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].entity_type(), EXPORT_ENTITY);
        assert_eq!(exports[0].details().get("recordCount"), Some(&1usize.into()));
    }

    #[test]
    fn test_export_auditing_can_be_disabled() {
        let trail = trail().with_export_auditing(false);
        trail.export(&AuditQuery::new(), ExportFormat::Json, None).unwrap();
        assert!(trail.store().is_empty());
    }

    #[test]
    fn test_from_config_memory_backend() {
        let config = AuditConfig::default()
            .with_ceiling(2)
            .with_storage(StorageBackend::Memory, None);
        let trail = AuditTrail::from_config(&config).unwrap();

        for _ in 0..3 {
            trail.record(RecordDraft::new(AuditAction::View, "patient"), None);
        }
        assert_eq!(trail.store().len(), 2);
    }

    #[test]
    fn test_clear_resets_history() {
        let trail = trail();
        trail.record(RecordDraft::new(AuditAction::Delete, "patient"), None);
        trail.clear().unwrap();
        assert!(trail.query(&AuditQuery::new()).is_empty());
    }
}
