//! Audit trail configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `CLINIC_AUDIT_*` environment variables (a `.env` file is read first).
//! Nested keys use a double underscore, e.g. `CLINIC_AUDIT_STORAGE__BACKEND=sqlite`.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Audit Configuration Constants
// ============================================================================

/// Maximum number of records retained before the oldest are evicted.
pub const DEFAULT_RETENTION_CEILING: usize = 1000;

/// Reserved storage key for the serialized record sequence.
pub const DEFAULT_STORAGE_KEY: &str = "audit_log";

/// Buffered notifications per subscriber before slow receivers lag.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 256;

/// Directory used when no storage path is configured and no platform data
/// directory exists.
pub const FALLBACK_STORAGE_DIR: &str = ".clinic-audit";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "CLINIC_AUDIT";

/// Durable storage flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key
    #[default]
    File,
    /// Single SQLite database
    Sqlite,
    /// Nothing survives the process
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::File => "file",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the record blob is kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Storage directory; defaults to the platform data dir
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, or `<data dir>/clinic-audit`, or
    /// [`FALLBACK_STORAGE_DIR`].
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("clinic-audit"))
                .unwrap_or_else(|| PathBuf::from(FALLBACK_STORAGE_DIR))
        })
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Retention ceiling
    pub ceiling: usize,
    pub storage_key: String,
    pub storage: StorageConfig,
    /// Broadcast buffer for live notifications
    pub notify_capacity: usize,
    /// Append an `export` record whenever an artifact is produced
    pub audit_exports: bool,
    /// How long to wait for the data manager's ready signal; `None` waits
    /// until the publisher is dropped
    pub bind_timeout_ms: Option<u64>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_RETENTION_CEILING,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage: StorageConfig::default(),
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
            audit_exports: true,
            bind_timeout_ms: None,
        }
    }
}

impl AuditConfig {
    /// Merge defaults, the optional file, and the environment, then validate
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.ceiling == 0 {
            return Err(AuditError::config("ceiling must be at least 1"));
        }
        if self.notify_capacity == 0 {
            return Err(AuditError::config("notify_capacity must be at least 1"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(AuditError::config("storage_key must not be empty"));
        }
        Ok(())
    }

    pub fn bind_timeout(&self) -> Option<Duration> {
        self.bind_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_storage(mut self, backend: StorageBackend, path: Option<PathBuf>) -> Self {
        self.storage = StorageConfig { backend, path };
        self
    }
}
