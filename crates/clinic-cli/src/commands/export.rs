//! `clinic-audit export` command implementation

use clinic_audit::{Actor, AuditTrail, ExportFormat};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::FilterArgs;

/// Export matching events and report where they were written
pub async fn run(
    trail: &AuditTrail,
    filters: &FilterArgs,
    format: ExportFormat,
    output: Option<&Path>,
    operator: Option<Actor>,
) -> Result<()> {
    let artifact = trail.export(&filters.to_query(), format, operator)?;

    let target = output.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let path = artifact.write_to(&target)?;

    println!(
        "{} Exported {} events to {}",
        "✓".green().bold(),
        artifact.record_count,
        path.display()
    );

    Ok(())
}
