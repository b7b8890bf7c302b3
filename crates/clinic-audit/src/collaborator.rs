//! Surface of the data manager that the audit layer observes
//!
//! The data manager publishes its mutating operations through an
//! [`OperationRegistry`] keyed by name. Callers invoke operations through the
//! registry, so the audit layer can decorate entries at composition time
//! without touching call sites.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::record::Actor;

/// Failure reported by a data manager operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Operation rejected: {0}")]
    Rejected(String),

    #[error("No operation named '{0}'")]
    UnknownOperation(String),
}

impl OperationError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }
}

/// Result of invoking an operation. `null` and `false` mean "nothing
/// happened"; any other value is a success.
pub type OperationResult = Result<JsonValue, OperationError>;

/// One named mutating operation
pub trait Operation: Send + Sync {
    fn invoke(&self, args: &JsonValue) -> OperationResult;
}

impl<F> Operation for F
where
    F: Fn(&JsonValue) -> OperationResult + Send + Sync,
{
    fn invoke(&self, args: &JsonValue) -> OperationResult {
        self(args)
    }
}

/// Whether an operation result counts as a completed change
pub fn is_success(result: &JsonValue) -> bool {
    !matches!(result, JsonValue::Null | JsonValue::Bool(false))
}

/// Identity of whoever is signed in right now
pub trait SessionSource: Send + Sync {
    fn current_user(&self) -> Option<Actor>;
}

/// Named operations exposed by the data manager
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, Arc<dyn Operation>>,
    tracked: bool,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable [`OperationRegistry::insert`]
    pub fn with<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&JsonValue) -> OperationResult + Send + Sync + 'static,
    {
        self.insert(name, operation);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, operation: F)
    where
        F: Fn(&JsonValue) -> OperationResult + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Run the operation called `name`
    pub fn invoke(&self, name: &str, args: &JsonValue) -> OperationResult {
        let operation = self
            .operations
            .get(name)
            .ok_or_else(|| OperationError::UnknownOperation(name.to_string()))?;
        operation.invoke(args)
    }

    /// Whether an audit layer already decorated this registry
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub(crate) fn replace(&mut self, name: &str, operation: Arc<dyn Operation>) {
        self.operations.insert(name.to_string(), operation);
    }

    pub(crate) fn mark_tracked(&mut self) {
        self.tracked = true;
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("tracked", &self.tracked)
            .finish()
    }
}

/// A data manager that can describe its own operations
pub trait DataManager: SessionSource {
    /// Registry of this manager's mutating operations
    fn operations(self: Arc<Self>) -> OperationRegistry;
}

/// Session plus operations, the unit the audit layer attaches to
#[derive(Clone)]
pub struct Collaborator {
    session: Arc<dyn SessionSource>,
    operations: OperationRegistry,
}

impl Collaborator {
    pub fn new(session: Arc<dyn SessionSource>, operations: OperationRegistry) -> Self {
        Self {
            session,
            operations,
        }
    }

    pub fn from_manager<M: DataManager + 'static>(manager: Arc<M>) -> Self {
        let operations = manager.clone().operations();
        Self::new(manager, operations)
    }

    pub fn invoke(&self, name: &str, args: &JsonValue) -> OperationResult {
        self.operations.invoke(name, args)
    }

    pub fn current_user(&self) -> Option<Actor> {
        self.session.current_user()
    }

    pub fn session(&self) -> &Arc<dyn SessionSource> {
        &self.session
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    pub fn is_tracked(&self) -> bool {
        self.operations.is_tracked()
    }

    pub(crate) fn operations_mut(&mut self) -> &mut OperationRegistry {
        &mut self.operations
    }
}

impl std::fmt::Debug for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborator")
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

/// Create a one-shot "data manager is ready" signal
///
/// The data manager side keeps the [`ReadyPublisher`]; whoever composes the
/// audit layer awaits the [`PendingCollaborator`].
pub fn ready_channel() -> (ReadyPublisher, PendingCollaborator) {
    let (tx, rx) = oneshot::channel();
    (ReadyPublisher { tx }, PendingCollaborator { rx })
}

/// Sending half of [`ready_channel`]
#[derive(Debug)]
pub struct ReadyPublisher {
    tx: oneshot::Sender<Collaborator>,
}

impl ReadyPublisher {
    /// Announce the collaborator. Returns `false` when nobody is waiting.
    pub fn publish(self, collaborator: Collaborator) -> bool {
        self.tx.send(collaborator).is_ok()
    }
}

/// Receiving half of [`ready_channel`]
#[derive(Debug)]
pub struct PendingCollaborator {
    rx: oneshot::Receiver<Collaborator>,
}

impl PendingCollaborator {
    /// Wait for the collaborator. `None` when the publisher is dropped
    /// unused or `timeout` elapses first.
    pub async fn wait(self, timeout: Option<Duration>) -> Option<Collaborator> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "Data manager never became ready");
                    return None;
                },
            },
            None => self.rx.await,
        };

        match received {
            Ok(collaborator) => Some(collaborator),
            Err(_) => {
                debug!("Data manager publisher dropped before becoming ready");
                None
            },
        }
    }
}
