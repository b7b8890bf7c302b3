//! Clinic Audit CLI Library
//!
//! Command-line access to a clinic's audit trail.
//!
//! # Overview
//!
//! - **Browsing**: Filter and page through recorded events (`clinic-audit list`)
//! - **Export**: Write CSV or JSON artifacts (`clinic-audit export`)
//! - **Reset**: Wipe retained history (`clinic-audit clear`)
//! - **Demo**: Drive an in-memory clinic through the audit layer
//!   (`clinic-audit demo`)

pub mod clinic;
pub mod commands;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use clinic_audit::{AuditAction, AuditQuery, ExportFormat, RawFilters};
use std::path::PathBuf;

/// Clinic Audit - inspect and export the clinic audit trail
#[derive(Parser, Debug)]
#[command(name = "clinic-audit")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, env = "CLINIC_AUDIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory, overriding the configured one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Name recorded as the actor of exports made from the command line
    #[arg(long, env = "CLINIC_AUDIT_OPERATOR", global = true)]
    pub operator: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recorded events, newest first
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Page to show (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Events per page
        #[arg(long, default_value = "20")]
        per_page: usize,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export matching events to a file
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Export format (csv, json)
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// Output file or directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all retained events
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run a scripted clinic session through the audit layer
    Demo {
        /// Print each event as it is recorded
        #[arg(short, long)]
        watch: bool,
    },
}

/// Event filters shared by `list` and `export`
///
/// Dates accept RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare date; a bare `--to`
/// date includes that whole day. Unparseable dates are ignored.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only events by this user id
    #[arg(long)]
    pub user: Option<String>,

    /// Only events on this entity type (patient, appointment, ...)
    #[arg(long)]
    pub entity: Option<String>,

    /// Only events with this action
    #[arg(long)]
    pub action: Option<AuditAction>,

    /// Only events on this entity id
    #[arg(long)]
    pub entity_id: Option<String>,

    /// Earliest event time (inclusive)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest event time (inclusive)
    #[arg(long)]
    pub to: Option<String>,
}

impl FilterArgs {
    pub fn to_query(&self) -> AuditQuery {
        let raw = RawFilters {
            actor_id: self.user.clone(),
            entity_type: self.entity.clone(),
            action: None,
            entity_id: self.entity_id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        };

        let query = AuditQuery::from_raw(&raw);
        match self.action {
            Some(action) => query.action(action),
            None => query,
        }
    }
}
