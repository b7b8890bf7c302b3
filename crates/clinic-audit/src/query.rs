//! Filtering and ordering of retained records
//!
//! Filters are conjunctive and every one is optional. Results are always
//! re-sorted newest first by timestamp; insertion order is never trusted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{AuditAction, EventRecord};

/// Typed filter set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    /// Exact match on `actor.id`; records without an actor never match
    pub actor_id: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_id: Option<String>,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub to: Option<DateTime<Utc>>,
    /// Records skipped after sorting
    pub offset: usize,
    /// Maximum records returned after `offset`
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor_id(mut self, id: impl Into<String>) -> Self {
        self.actor_id = Some(id.into());
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn window(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Build from loosely typed input. Blank values, unknown actions and
    /// unparseable dates impose no constraint.
    pub fn from_raw(raw: &RawFilters) -> Self {
        Self {
            actor_id: non_blank(&raw.actor_id),
            entity_type: non_blank(&raw.entity_type),
            action: non_blank(&raw.action).and_then(|a| match a.parse() {
                Ok(action) => Some(action),
                Err(_) => {
                    debug!(action = %a, "Ignoring unknown action filter");
                    None
                },
            }),
            entity_id: non_blank(&raw.entity_id),
            from: non_blank(&raw.from).and_then(|s| parse_bound(&s, Bound::Start)),
            to: non_blank(&raw.to).and_then(|s| parse_bound(&s, Bound::End)),
            offset: 0,
            limit: None,
        }
    }

    /// Whether `record` satisfies every supplied filter
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(ref actor_id) = self.actor_id {
            if record.actor().map(|a| &a.id) != Some(actor_id) {
                return false;
            }
        }
        if let Some(ref entity_type) = self.entity_type {
            if record.entity_type() != entity_type {
                return false;
            }
        }
        if let Some(action) = self.action {
            if record.action() != action {
                return false;
            }
        }
        if let Some(ref entity_id) = self.entity_id {
            if record.entity_id() != Some(entity_id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.timestamp() < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.timestamp() > to {
                return false;
            }
        }
        true
    }

    /// Filter, sort newest first, then window
    pub fn apply(&self, records: impl IntoIterator<Item = EventRecord>) -> Vec<EventRecord> {
        let mut matched: Vec<EventRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        let total = matched.len();
        let windowed: Vec<EventRecord> = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        debug!(matched = total, returned = windowed.len(), "Queried audit records");
        windowed
    }
}

/// Filter input as it arrives from a form, query string or command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFilters {
    #[serde(alias = "userId")]
    pub actor_id: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub entity_id: Option<String>,
    #[serde(alias = "timestampFrom", alias = "startDate")]
    pub from: Option<String>,
    #[serde(alias = "timestampTo", alias = "endDate")]
    pub to: Option<String>,
}

/// Convenience for `query.apply(records.to_vec())`
pub fn query(records: &[EventRecord], query: &AuditQuery) -> Vec<EventRecord> {
    query.apply(records.iter().cloned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// RFC 3339, a naive date-time (taken as UTC), or a bare date. A bare date
/// used as an upper bound covers the whole day.
fn parse_bound(input: &str, bound: Bound) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let naive = match bound {
            Bound::Start => date.and_hms_opt(0, 0, 0),
            Bound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
        };
        return naive.map(|n| n.and_utc());
    }

    debug!(input, "Ignoring unparseable date filter");
    None
}
