//! Clinic Audit CLI - Main entry point

use clap::Parser;
use clinic_audit::AuditTrail;
use clinic_cli::commands::{self, load_config, operator_actor};
use clinic_cli::{Cli, Commands};
use clinic_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use std::sync::Arc;
use tracing::error;

fn base_log_config(verbose: bool) -> LogConfig {
    // Verbose mode: debug to console; otherwise warnings only
    let level = if verbose { LogLevel::Debug } else { LogLevel::Warn };
    LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("clinic-audit")
        .build()
}

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Environment variables take precedence over the flag defaults
    let log_config = base_log_config(cli.verbose)
        .merge_env()
        .unwrap_or_else(|_| base_log_config(cli.verbose));

    // Initialize logging (ignore errors as CLI should work without logging)
    let _ = init_logging(&log_config);

    // Execute command
    let result = execute_command(&cli).await;

    // Handle result
    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> clinic_cli::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.store.as_ref())?;
    let trail = Arc::new(AuditTrail::from_config(&config)?);

    match &cli.command {
        Commands::List {
            filters,
            page,
            per_page,
            json,
        } => commands::list::run(&trail, filters, *page, *per_page, *json).await,

        Commands::Export {
            filters,
            format,
            output,
        } => {
            commands::export::run(
                &trail,
                filters,
                *format,
                output.as_deref(),
                operator_actor(cli.operator.as_deref()),
            )
            .await
        },

        Commands::Clear { yes } => commands::clear::run(&trail, *yes).await,

        Commands::Demo { watch } => {
            commands::demo::run(trail.clone(), *watch, config.bind_timeout()).await
        },
    }
}
