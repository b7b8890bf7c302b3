//! Audit trail export
//!
//! Turns a record set into a portable artifact. Delivery (writing a file,
//! streaming a download) is left to the caller.

pub mod csv;
pub mod formats;

pub use self::csv::{to_tabular, to_tabular_in};
pub use formats::ExportFormat;

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::record::EventRecord;

/// Rendered export ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name, `audit-log-<YYYY-MM-DD>.<ext>`
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    /// Number of records rendered
    pub record_count: usize,
}

impl ExportArtifact {
    /// Write to `target`. An existing directory receives the suggested file
    /// name; anything else is used as the file path.
    pub fn write_to(&self, target: &Path) -> Result<PathBuf> {
        let path = if target.is_dir() {
            target.join(&self.filename)
        } else {
            target.to_path_buf()
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &self.bytes)?;

        debug!(path = %path.display(), bytes = self.bytes.len(), "Wrote audit export");
        Ok(path)
    }
}

/// Render `records` in `format`, named after today's local date
pub fn export(records: &[EventRecord], format: ExportFormat) -> Result<ExportArtifact> {
    export_dated(records, format, Local::now().date_naive())
}

/// Render `records` in `format`, named after `date`
pub fn export_dated(
    records: &[EventRecord],
    format: ExportFormat,
    date: NaiveDate,
) -> Result<ExportArtifact> {
    let bytes = match format {
        ExportFormat::Csv => to_tabular(records)?.into_bytes(),
        ExportFormat::Json => serde_json::to_vec_pretty(records)?,
    };

    Ok(ExportArtifact {
        filename: format.filename_for(date),
        content_type: format.content_type(),
        bytes,
        format,
        record_count: records.len(),
    })
}
