//! Export format definitions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated table with a header row
    #[default]
    Csv,
    /// Pretty-printed array of full records
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    /// `audit-log-<YYYY-MM-DD>.<ext>`
    pub fn filename_for(&self, date: NaiveDate) -> String {
        format!("audit-log-{}.{}", date.format("%Y-%m-%d"), self.extension())
    }

    pub fn as_str(&self) -> &'static str {
        self.extension()
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(AuditError::UnknownFormat(s.to_string())),
        }
    }
}
