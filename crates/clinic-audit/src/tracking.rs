//! Interception layer for data manager operations
//!
//! [`AuditLayer`] decorates named entries of an [`OperationRegistry`] with a
//! [`Tracked`] wrapper:
//! - Optionally snapshots the target entity before the original runs
//! - Invokes the original with the caller's arguments
//! - On a truthy result, builds a record and hands it to the logger
//! - Returns the original result or error untouched

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::collaborator::{
    is_success, Collaborator, Operation, OperationResult, PendingCollaborator, SessionSource,
};
use crate::logger::AuditLogger;
use crate::record::{Actor, RecordDraft};

/// Everything a record mapper can see about one completed call
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub args: &'a JsonValue,
    pub result: &'a JsonValue,
    /// Session user when the call started
    pub actor_before: Option<&'a Actor>,
    /// Session user once the call returned
    pub actor_after: Option<&'a Actor>,
    /// Entity state captured before the original ran, if requested
    pub snapshot: Option<&'a JsonValue>,
}

impl<'a> Invocation<'a> {
    /// Default attribution: whoever started the call, else whoever holds the
    /// session afterwards
    pub fn actor(&self) -> Option<&'a Actor> {
        self.actor_before.or(self.actor_after)
    }
}

type RecordMapper = dyn Fn(&Invocation<'_>) -> Option<RecordDraft> + Send + Sync;
type SnapshotFn = dyn Fn(&JsonValue) -> Option<JsonValue> + Send + Sync;

/// How one named operation maps to audit records
#[derive(Clone)]
pub struct TrackSpec {
    operation: String,
    to_record: Arc<RecordMapper>,
    snapshot: Option<Arc<SnapshotFn>>,
}

impl TrackSpec {
    /// Track `operation`. `to_record` may return `None` to skip a call.
    pub fn new<F>(operation: impl Into<String>, to_record: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Option<RecordDraft> + Send + Sync + 'static,
    {
        Self {
            operation: operation.into(),
            to_record: Arc::new(to_record),
            snapshot: None,
        }
    }

    /// Capture entity state from the arguments before the original runs.
    /// Required for deletes, whose target is gone afterwards.
    pub fn snapshot_before<F>(mut self, snapshot: F) -> Self
    where
        F: Fn(&JsonValue) -> Option<JsonValue> + Send + Sync + 'static,
    {
        self.snapshot = Some(Arc::new(snapshot));
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl std::fmt::Debug for TrackSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackSpec")
            .field("operation", &self.operation)
            .field("snapshot", &self.snapshot.is_some())
            .finish()
    }
}

/// Decorates a collaborator's operations with audit logging
#[derive(Clone)]
pub struct AuditLayer {
    logger: Arc<dyn AuditLogger>,
    specs: Vec<TrackSpec>,
}

impl AuditLayer {
    pub fn new(logger: Arc<dyn AuditLogger>) -> Self {
        Self {
            logger,
            specs: Vec::new(),
        }
    }

    /// Add `spec`. A later spec for the same operation replaces the earlier
    /// one, so an operation is never wrapped twice.
    pub fn track(mut self, spec: TrackSpec) -> Self {
        match self.specs.iter_mut().find(|s| s.operation == spec.operation) {
            Some(existing) => {
                debug!(operation = %spec.operation, "Replacing existing track spec");
                *existing = spec;
            },
            None => self.specs.push(spec),
        }
        self
    }

    pub fn specs(&self) -> &[TrackSpec] {
        &self.specs
    }

    /// Wrap every tracked operation the collaborator exposes
    ///
    /// Already-tracked collaborators are returned as-is, so each real call
    /// yields at most one record however often this runs.
    pub fn attach(&self, mut collaborator: Collaborator) -> Collaborator {
        if collaborator.is_tracked() {
            debug!("Collaborator already tracked, skipping");
            return collaborator;
        }

        let session = collaborator.session().clone();
        let mut wrapped = 0usize;

        for spec in &self.specs {
            let Some(inner) = collaborator.operations().get(&spec.operation) else {
                debug!(operation = %spec.operation, "Operation not exposed, not tracking");
                continue;
            };

            let tracked = Tracked {
                inner,
                spec: spec.clone(),
                logger: self.logger.clone(),
                session: session.clone(),
            };
            collaborator
                .operations_mut()
                .replace(&spec.operation, Arc::new(tracked));
            wrapped += 1;
        }

        collaborator.operations_mut().mark_tracked();
        info!(operations = wrapped, "Audit tracking attached");
        collaborator
    }

    /// Wait for the data manager's ready signal, then attach
    ///
    /// Resolves to `None` when the signal never arrives; tracking simply stays
    /// inactive in that case.
    pub async fn attach_when_ready(
        &self,
        pending: PendingCollaborator,
        timeout: Option<Duration>,
    ) -> Option<Collaborator> {
        let collaborator = pending.wait(timeout).await?;
        Some(self.attach(collaborator))
    }
}

/// An operation that reports successful calls to an [`AuditLogger`]
pub struct Tracked {
    inner: Arc<dyn Operation>,
    spec: TrackSpec,
    logger: Arc<dyn AuditLogger>,
    session: Arc<dyn SessionSource>,
}

impl Operation for Tracked {
    fn invoke(&self, args: &JsonValue) -> OperationResult {
        let snapshot = self.spec.snapshot.as_ref().and_then(|take| take(args));
        let before = self.session.current_user();

        let result = self.inner.invoke(args)?;
        if !is_success(&result) {
            return Ok(result);
        }

        let after = self.session.current_user();
        let invocation = Invocation {
            args,
            result: &result,
            actor_before: before.as_ref(),
            actor_after: after.as_ref(),
            snapshot: snapshot.as_ref(),
        };

        match (self.spec.to_record)(&invocation) {
            Some(draft) => {
                let actor = invocation.actor().cloned();
                let record = draft.into_record(actor, self.logger.origin().clone());
                let receipt = self.logger.log_event(record);
                debug!(
                    operation = %self.spec.operation,
                    persisted = receipt.persisted,
                    "Tracked operation recorded"
                );
            },
            None => debug!(operation = %self.spec.operation, "Mapper skipped record"),
        }

        Ok(result)
    }
}
