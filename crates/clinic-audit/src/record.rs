//! Audit record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::AuditError;
use crate::origin::Origin;

/// Audit action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    Export,
    Login,
    Logout,
}

impl AuditAction {
    pub const ALL: [AuditAction; 7] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
        AuditAction::View,
        AuditAction::Export,
        AuditAction::Login,
        AuditAction::Logout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::View => "view",
            Self::Export => "export",
            Self::Login => "login",
            Self::Logout => "logout",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == wanted)
            .ok_or_else(|| AuditError::UnknownAction(s.to_string()))
    }
}

/// Identity attributed to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

/// One value inside [`Details`]
///
/// Only scalars and nested maps are representable so every record can be
/// persisted and exported without loss. Floats are always finite: JSON has no
/// NaN or infinity, so those are kept as their text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Map(Details),
}

impl DetailValue {
    /// Convert an arbitrary JSON value. `null` has no representation and
    /// yields `None`; arrays are kept as their JSON text.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            JsonValue::String(s) => Some(Self::Text(s.clone())),
            JsonValue::Array(_) => Some(Self::Text(value.to_string())),
            JsonValue::Object(_) => Some(Self::Map(Details::from_json(value))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn finite(self) -> Self {
        match self {
            Self::Float(f) if !f.is_finite() => Self::Text(f.to_string()),
            other => other,
        }
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DetailValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DetailValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for DetailValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for DetailValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        Self::Float(value).finite()
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Details> for DetailValue {
    fn from(value: Details) -> Self {
        Self::Map(value)
    }
}

/// Action-specific context attached to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Details(BTreeMap<String, DetailValue>);

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DetailValue>) {
        self.0.insert(key.into(), value.into().finite());
    }

    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DetailValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build details from a JSON value. Object fields are converted one by
    /// one (nulls dropped); any other value is stored under `"value"`.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self(
                map.iter()
                    .filter_map(|(k, v)| DetailValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            ),
            other => {
                let mut details = Self::new();
                if let Some(v) = DetailValue::from_json(other) {
                    details.insert("value", v);
                }
                details
            }
        }
    }

    /// Copy the listed fields of a JSON object, skipping absent ones.
    pub fn pick(value: &JsonValue, fields: &[&str]) -> Self {
        let mut details = Self::new();
        for field in fields {
            if let Some(v) = value.get(*field).and_then(DetailValue::from_json) {
                details.insert(*field, v);
            }
        }
        details
    }
}

/// Everything about an event except its identity, time and attribution
///
/// Produced by tracking specs and direct log calls, then stamped into an
/// [`EventRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Details,
    /// Overrides the actor supplied when the draft is stamped
    pub attributed_to: Option<Actor>,
}

impl RecordDraft {
    pub fn new(action: AuditAction, entity_type: impl Into<String>) -> Self {
        Self {
            action,
            entity_type: entity_type.into(),
            entity_id: None,
            details: Details::new(),
            attributed_to: None,
        }
    }

    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn maybe_entity_id(mut self, id: Option<String>) -> Self {
        self.entity_id = id;
        self
    }

    pub fn details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key, value);
        self
    }

    /// Attribute the record to `actor` whatever the caller supplies
    pub fn attributed_to(mut self, actor: Actor) -> Self {
        self.attributed_to = Some(actor);
        self
    }

    /// Stamp with a fresh id and the current time
    pub fn into_record(self, actor: Option<Actor>, origin: Origin) -> EventRecord {
        self.into_record_at(actor, origin, Utc::now())
    }

    /// Stamp with a fresh id and an explicit time
    pub fn into_record_at(
        self,
        actor: Option<Actor>,
        origin: Origin,
        timestamp: DateTime<Utc>,
    ) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            timestamp,
            actor: self.attributed_to.or(actor),
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            details: self.details,
            origin,
        }
    }
}

/// One immutable audit entry
///
/// Fields are read-only after construction; the store only ever hands out
/// clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    id: Uuid,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor: Option<Actor>,
    action: AuditAction,
    entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity_id: Option<String>,
    #[serde(default)]
    details: Details,
    #[serde(default)]
    origin: Origin,
}

impl EventRecord {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}
