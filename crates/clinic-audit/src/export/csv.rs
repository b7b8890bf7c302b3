//! Tabular (CSV) rendering of audit records

use chrono::{DateTime, Local, TimeZone};
use csv::Writer;

use crate::error::{AuditError, Result};
use crate::record::EventRecord;

/// Column order of every export
pub const CSV_HEADER: [&str; 7] = [
    "Time",
    "User",
    "Role",
    "Action",
    "Entity Type",
    "Entity ID",
    "Details",
];

/// Shown in the User column for events without an actor
pub const SYSTEM_ACTOR: &str = "System";

/// Shown for absent role and entity id
pub const NOT_APPLICABLE: &str = "N/A";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `records` as CSV with a header row, times in local time
pub fn to_tabular(records: &[EventRecord]) -> Result<String> {
    to_tabular_in(records, &Local)
}

/// Render `records` as CSV with times shown in `tz`
pub fn to_tabular_in<Tz>(records: &[EventRecord], tz: &Tz) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for record in records {
        wtr.write_record(row(record, tz)?)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| AuditError::export(format!("CSV writer error: {}", e)))?;
    String::from_utf8(data).map_err(|e| AuditError::export(format!("UTF-8 conversion error: {}", e)))
}

fn row<Tz>(record: &EventRecord, tz: &Tz) -> Result<[String; 7]>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let local: DateTime<Tz> = record.timestamp().with_timezone(tz);
    let actor = record.actor();

    Ok([
        local.format(TIME_FORMAT).to_string(),
        actor.map_or_else(|| SYSTEM_ACTOR.to_string(), |a| a.name.clone()),
        actor.map_or_else(|| NOT_APPLICABLE.to_string(), |a| a.role.clone()),
        record.action().to_string(),
        record.entity_type().to_string(),
        record.entity_id().unwrap_or(NOT_APPLICABLE).to_string(),
        serde_json::to_string(record.details())?,
    ])
}
