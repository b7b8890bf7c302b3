//! Which clinic operations are audited, and how

use clinic_audit::{
    AuditAction, AuditLayer, AuditLogger, Details, Invocation, RecordDraft, TrackSpec,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::ClinicData;

const PATIENT_FIELDS: &[&str] = &["name", "phone", "dateOfBirth"];
const APPOINTMENT_FIELDS: &[&str] = &["patientId", "date", "time", "status", "reason"];

fn id_of(value: &JsonValue) -> Option<String> {
    value.get("id").and_then(JsonValue::as_str).map(str::to_string)
}

fn created(operation: &str, entity: &'static str, fields: &'static [&'static str]) -> TrackSpec {
    TrackSpec::new(operation, move |inv: &Invocation<'_>| {
        Some(
            RecordDraft::new(AuditAction::Create, entity)
                .maybe_entity_id(id_of(inv.result))
                .details(Details::pick(inv.result, fields)),
        )
    })
}

/// Records only the fields the caller asked to change
fn updated(operation: &str, entity: &'static str, fields: &'static [&'static str]) -> TrackSpec {
    TrackSpec::new(operation, move |inv: &Invocation<'_>| {
        Some(
            RecordDraft::new(AuditAction::Update, entity)
                .maybe_entity_id(id_of(inv.args))
                .details(Details::pick(inv.args, fields)),
        )
    })
}

/// Build the audit layer for a [`ClinicData`] manager
///
/// Deletes snapshot the entity first so the record still names what was
/// removed.
pub fn clinic_layer(logger: Arc<dyn AuditLogger>, clinic: Arc<ClinicData>) -> AuditLayer {
    let patients = clinic.clone();
    let appointments = clinic;

    AuditLayer::new(logger)
        // Attributed to whoever holds the session afterwards
        .track(TrackSpec::new("login", |inv: &Invocation<'_>| {
            let actor = inv.actor_after?;
            Some(
                RecordDraft::new(AuditAction::Login, "session")
                    .entity_id(actor.id.clone())
                    .detail("role", actor.role.clone())
                    .attributed_to(actor.clone()),
            )
        }))
        .track(TrackSpec::new("logout", |inv: &Invocation<'_>| {
            Some(
                RecordDraft::new(AuditAction::Logout, "session")
                    .maybe_entity_id(inv.actor_before.map(|a| a.id.clone())),
            )
        }))
        .track(created("addPatient", "patient", PATIENT_FIELDS))
        .track(updated("updatePatient", "patient", PATIENT_FIELDS))
        .track(
            TrackSpec::new("deletePatient", |inv: &Invocation<'_>| {
                Some(
                    RecordDraft::new(AuditAction::Delete, "patient")
                        .maybe_entity_id(id_of(inv.args))
                        .details(
                            inv.snapshot
                                .map(|s| Details::pick(s, PATIENT_FIELDS))
                                .unwrap_or_default(),
                        ),
                )
            })
            .snapshot_before(move |args| {
                let patient = patients.patient(args.get("id")?.as_str()?)?;
                serde_json::to_value(patient).ok()
            }),
        )
        .track(created("addAppointment", "appointment", APPOINTMENT_FIELDS))
        .track(updated("updateAppointment", "appointment", APPOINTMENT_FIELDS))
        .track(
            TrackSpec::new("deleteAppointment", |inv: &Invocation<'_>| {
                Some(
                    RecordDraft::new(AuditAction::Delete, "appointment")
                        .maybe_entity_id(id_of(inv.args))
                        .details(
                            inv.snapshot
                                .map(|s| Details::pick(s, APPOINTMENT_FIELDS))
                                .unwrap_or_default(),
                        ),
                )
            })
            .snapshot_before(move |args| {
                let appointment = appointments.appointment(args.get("id")?.as_str()?)?;
                serde_json::to_value(appointment).ok()
            }),
        )
}
