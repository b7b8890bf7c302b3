//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod clear;
pub mod demo;
pub mod export;
pub mod list;

use clinic_audit::{Actor, AuditConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CliError, Result};

/// Role recorded for actions taken from the command line
pub const OPERATOR_ROLE: &str = "operator";

/// Resolve configuration from `--config`, the environment and `--store`
pub fn load_config(config: Option<&Path>, store: Option<&PathBuf>) -> Result<AuditConfig> {
    let mut config = AuditConfig::load(config)?;

    if let Some(dir) = store {
        if dir.is_file() {
            return Err(CliError::config(format!(
                "--store must be a directory, '{}' is a file",
                dir.display()
            )));
        }
        config.storage.path = Some(dir.clone());
    }

    debug!(
        backend = %config.storage.backend,
        path = %config.storage.resolved_path().display(),
        "Resolved audit storage"
    );
    Ok(config)
}

/// Actor for the person running the CLI, if they named themselves
pub fn operator_actor(operator: Option<&str>) -> Option<Actor> {
    operator
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Actor::new(name, name, OPERATOR_ROLE))
}
