//! Error types for the Clinic Audit CLI
//!
//! User-facing errors with a hint at how to recover.

use clinic_audit::{AuditError, OperationError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Audit trail could not be opened, queried or exported
    #[error("Audit trail error: {0}")]
    Audit(#[from] AuditError),

    /// A clinic operation in the demo session failed
    #[error("Clinic operation failed: {0}")]
    Operation(#[from] OperationError),

    /// The demo data manager never became ready
    #[error("Clinic data manager did not become ready. Check 'bind_timeout_ms' in your configuration.")]
    NotReady,

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON rendering failed
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or config file.")]
    Config(String),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
