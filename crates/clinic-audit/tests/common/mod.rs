//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use clinic_audit::{
    Actor, AuditAction, AuditLayer, AuditTrail, Collaborator, DataManager, Details, EventRecord,
    Invocation, MemoryStorage, OperationError, OperationRegistry, Origin, RecordDraft,
    SessionSource, TrackSpec,
};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Minimal patient registry with a settable session
#[derive(Default)]
pub struct FakeClinic {
    pub user: Mutex<Option<Actor>>,
    pub patients: Mutex<BTreeMap<String, JsonValue>>,
}

impl FakeClinic {
    pub fn signed_in(actor: Actor) -> Arc<Self> {
        let clinic = Self::default();
        *clinic.user.lock().unwrap() = Some(actor);
        Arc::new(clinic)
    }

    pub fn patient(&self, id: &str) -> Option<JsonValue> {
        self.patients.lock().unwrap().get(id).cloned()
    }
}

impl SessionSource for FakeClinic {
    fn current_user(&self) -> Option<Actor> {
        self.user.lock().unwrap().clone()
    }
}

impl DataManager for FakeClinic {
    fn operations(self: Arc<Self>) -> OperationRegistry {
        let add = self.clone();
        let remove = self.clone();

        OperationRegistry::new()
            .with("addPatient", move |args: &JsonValue| {
                let id = args["id"]
                    .as_str()
                    .ok_or_else(|| OperationError::invalid("id is required"))?;
                add.patients.lock().unwrap().insert(id.to_string(), args.clone());
                Ok(args.clone())
            })
            .with("deletePatient", move |args: &JsonValue| {
                let id = args["id"].as_str().unwrap_or_default();
                Ok(JsonValue::Bool(remove.patients.lock().unwrap().remove(id).is_some()))
            })
    }
}

pub fn admin() -> Actor {
    Actor::new("u-admin", "Ada Admin", "admin")
}

pub fn memory_trail() -> Arc<AuditTrail> {
    Arc::new(
        AuditTrail::new(Arc::new(MemoryStorage::new()))
            .with_origin(Origin::default().with_agent("integration-tests")),
    )
}

/// Layer tracking patient creation and deletion
pub fn patient_layer(trail: Arc<AuditTrail>, clinic: Arc<FakeClinic>) -> AuditLayer {
    AuditLayer::new(trail)
        .track(TrackSpec::new("addPatient", |inv: &Invocation<'_>| {
            Some(
                RecordDraft::new(AuditAction::Create, "patient")
                    .maybe_entity_id(inv.result["id"].as_str().map(str::to_string))
                    .details(Details::pick(inv.result, &["name", "phone"])),
            )
        }))
        .track(
            TrackSpec::new("deletePatient", |inv: &Invocation<'_>| {
                let snapshot = inv.snapshot?;
                Some(
                    RecordDraft::new(AuditAction::Delete, "patient")
                        .maybe_entity_id(inv.args["id"].as_str().map(str::to_string))
                        .details(Details::pick(snapshot, &["name"])),
                )
            })
            .snapshot_before(move |args| clinic.patient(args["id"].as_str()?)),
        )
}

pub fn tracked_clinic(trail: Arc<AuditTrail>, clinic: Arc<FakeClinic>) -> Collaborator {
    patient_layer(trail, clinic.clone()).attach(Collaborator::from_manager(clinic))
}

/// Fixed instant plus `minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn record_at(action: AuditAction, entity_type: &str, minutes: i64) -> EventRecord {
    RecordDraft::new(action, entity_type).into_record_at(None, Origin::default(), at(minutes))
}

pub fn json_patient(id: &str, name: &str) -> JsonValue {
    json!({"id": id, "name": name, "phone": "555-0100"})
}
