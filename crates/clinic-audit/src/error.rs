//! Error types for the audit trail

use thiserror::Error;

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors raised by the audit trail's own surface (configuration, export,
/// parsing). Persistence problems during `append` never reach callers; they
/// are logged and absorbed by the retention store.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Durable storage could not be opened or read
    #[error("Audit storage error: {0}")]
    Storage(#[from] StorageError),

    /// Record (de)serialization failed
    #[error("Failed to serialize audit data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration value is missing or out of range
    #[error("Audit configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be merged
    #[error("Failed to load audit configuration: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Action name outside the fixed vocabulary
    #[error("Unknown audit action '{0}'. Valid actions: create, update, delete, view, export, login, logout")]
    UnknownAction(String),

    /// Export format name not recognised
    #[error("Unknown export format '{0}'. Valid formats: csv, json")]
    UnknownFormat(String),

    /// Writing an export artifact failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular rendering failed
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Rendered export could not be finalised
    #[error("Export failed: {0}")]
    Export(String),
}

impl AuditError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

/// Failures of a durable key-value backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would exceed the backend's byte quota
    #[error("Storage quota exceeded: {needed} bytes needed, {limit} bytes allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite storage failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Key contains characters the backend cannot represent
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}
