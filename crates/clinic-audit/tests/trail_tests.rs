//! Integration tests for the audit trail
//!
//! Covers the end-to-end path from a tracked data manager call to queries
//! and exports:
//! - Ordering and retention
//! - Non-interference with the observed operation
//! - Delete snapshots
//! - Filter conjunction
//! - Idempotent attachment and deferred binding
//! - Persistence across restarts
//! - Notifications

mod common;

use clinic_audit::export::to_tabular;
use clinic_audit::{
    query, ready_channel, AuditAction, AuditQuery, AuditTrail, Collaborator, DetailValue,
    Details, EventRecord, FileStorage, MemoryStorage, OperationError, RawFilters, RecordDraft,
    RetentionStore,
};
use common::*;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast::error::TryRecvError;

fn timestamps_descending(records: &[EventRecord]) -> bool {
    records.windows(2).all(|w| w[0].timestamp() >= w[1].timestamp())
}

#[test]
fn test_tracked_create_is_recorded() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic);

    collaborator
        .invoke("addPatient", &json_patient("p-1", "Jane Doe"))
        .unwrap();

    let records = trail.query(&AuditQuery::new());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.action(), AuditAction::Create);
    assert_eq!(record.entity_type(), "patient");
    assert_eq!(record.entity_id(), Some("p-1"));
    assert_eq!(record.actor().map(|a| a.name.as_str()), Some("Ada Admin"));
    assert_eq!(record.details().get("name").and_then(|v| v.as_str()), Some("Jane Doe"));
    assert_eq!(record.origin().agent.as_deref(), Some("integration-tests"));
}

#[test]
fn test_wrapped_operation_is_not_altered() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let plain = Collaborator::from_manager(clinic.clone());
    let tracked = tracked_clinic(trail.clone(), clinic);

    let args = json_patient("p-2", "John Roe");
    let expected = plain.invoke("addPatient", &args).unwrap();
    assert_eq!(tracked.invoke("addPatient", &args).unwrap(), expected);

    let err = tracked.invoke("addPatient", &json!({"name": "No Id"})).unwrap_err();
    assert!(matches!(err, OperationError::InvalidArguments(_)));

    // Only the successful tracked call left a record
    assert_eq!(trail.store().len(), 1);
}

#[test]
fn test_delete_records_pre_deletion_details() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic.clone());

    collaborator
        .invoke("addPatient", &json_patient("p-3", "Mary Major"))
        .unwrap();
    let deleted = collaborator.invoke("deletePatient", &json!({"id": "p-3"})).unwrap();
    assert_eq!(deleted, json!(true));
    assert!(clinic.patient("p-3").is_none());

    let deletes = trail.query(&AuditQuery::new().action(AuditAction::Delete));
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].entity_id(), Some("p-3"));
    assert_eq!(
        deletes[0].details().get("name").and_then(|v| v.as_str()),
        Some("Mary Major")
    );
}

#[test]
fn test_delete_of_missing_patient_is_not_recorded() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic);

    assert_eq!(
        collaborator.invoke("deletePatient", &json!({"id": "ghost"})).unwrap(),
        json!(false)
    );
    assert!(trail.store().is_empty());
}

#[test]
fn test_attaching_twice_logs_once() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let layer = patient_layer(trail.clone(), clinic.clone());

    let once = layer.attach(Collaborator::from_manager(clinic));
    let twice = layer.attach(once);

    twice.invoke("addPatient", &json_patient("p-4", "Sam Smith")).unwrap();
    assert_eq!(trail.store().len(), 1);
}

#[test]
fn test_filter_conjunction() {
    let records = vec![
        record_at(AuditAction::Create, "patient", 0),
        record_at(AuditAction::Update, "patient", 1),
        record_at(AuditAction::Create, "appointment", 2),
    ];

    let both = query(
        &records,
        &AuditQuery::new().entity_type("patient").action(AuditAction::Create),
    );
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].timestamp(), at(0));

    assert_eq!(query(&records, &AuditQuery::new()).len(), 3);
}

#[test]
fn test_lenient_raw_filters() {
    let records = vec![
        record_at(AuditAction::Create, "patient", 0),
        record_at(AuditAction::Delete, "patient", 60 * 24),
    ];

    let raw: RawFilters = serde_json::from_value(json!({
        "action": "teleport",
        "entityType": "",
        "timestampFrom": "not a date",
        "timestampTo": "2024-03-10",
    }))
    .unwrap();

    // Unknown action, empty type and bad date impose nothing; the date-only
    // upper bound covers all of March 10
    let results = query(&records, &AuditQuery::from_raw(&raw));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].action(), AuditAction::Create);
}

#[test]
fn test_example_create_update_delete() {
    let records = vec![
        record_at(AuditAction::Create, "appointment", 1),
        record_at(AuditAction::Update, "appointment", 2),
        record_at(AuditAction::Delete, "appointment", 3),
    ];

    let deletes = query(&records, &AuditQuery::new().action(AuditAction::Delete));
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].timestamp(), at(3));

    let csv = to_tabular(&deletes).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Time,User,Role,Action"));
    assert_eq!(lines[1].split(',').nth(3), Some("delete"));
}

#[test]
fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let trail = AuditTrail::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
        trail.append(record_at(AuditAction::Create, "patient", 0));
        trail.append(record_at(AuditAction::Update, "patient", 5));
    }

    let reopened = AuditTrail::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
    let records = reopened.query(&AuditQuery::new());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action(), AuditAction::Update);
}

#[test]
fn test_quota_failure_is_invisible_to_callers() {
    let storage = Arc::new(MemoryStorage::with_quota(64));
    let trail = Arc::new(AuditTrail::with_store(RetentionStore::new(storage, 10)));
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic);

    let result = collaborator.invoke("addPatient", &json_patient("p-5", "Quota Quinn"));
    assert!(result.is_ok());
    assert_eq!(trail.store().len(), 1);
    assert!(trail.store().is_degraded());
}

#[tokio::test]
async fn test_deferred_binding_attaches_once_ready() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let layer = patient_layer(trail.clone(), clinic.clone());
    let (publisher, pending) = ready_channel();

    let binder =
        tokio::spawn(async move { layer.attach_when_ready(pending, Some(Duration::from_secs(5))).await });

    // Data manager finishes initializing later
    tokio::task::yield_now().await;
    assert!(publisher.publish(Collaborator::from_manager(clinic)));

    let collaborator = binder.await.unwrap().unwrap();
    assert!(collaborator.is_tracked());
    collaborator
        .invoke("addPatient", &json_patient("p-6", "Late Binder"))
        .unwrap();
    assert_eq!(trail.store().len(), 1);
}

#[tokio::test]
async fn test_missing_collaborator_leaves_tracking_inactive() {
    let trail = memory_trail();
    let clinic = FakeClinic::signed_in(admin());
    let layer = patient_layer(trail, clinic);
    let (publisher, pending) = ready_channel();
    drop(publisher);

    assert!(layer.attach_when_ready(pending, None).await.is_none());
}

#[tokio::test]
async fn test_tracked_calls_notify_listeners() {
    let trail = memory_trail();
    let mut feed = trail.subscribe();
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic);

    collaborator
        .invoke("addPatient", &json_patient("p-7", "Live Feed"))
        .unwrap();

    let notified = feed.recv().await.unwrap();
    assert_eq!(notified.entity_id(), Some("p-7"));
}

#[tokio::test]
async fn test_failed_calls_notify_nobody() {
    let trail = memory_trail();
    let mut feed = trail.subscribe();
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic);

    let err = collaborator.invoke("addPatient", &json!({"name": "No Id"})).unwrap_err();
    assert!(matches!(err, OperationError::InvalidArguments(_)));
    let missing = collaborator
        .invoke("deletePatient", &json!({"id": "p-404"}))
        .unwrap();
    assert_eq!(missing, json!(false));

    assert!(matches!(feed.try_recv(), Err(TryRecvError::Empty)));
    assert!(trail.store().is_empty());
}

#[tokio::test]
async fn test_notification_follows_retention() {
    let trail = memory_trail();
    let mut feed = trail.subscribe();
    let clinic = FakeClinic::signed_in(admin());
    let collaborator = tracked_clinic(trail.clone(), clinic);

    collaborator
        .invoke("addPatient", &json_patient("p-8", "Retained First"))
        .unwrap();

    let notified = feed.recv().await.unwrap();
    let retained = trail.store().all();
    assert!(retained.iter().any(|r| r.id() == notified.id()));
    assert_eq!(retained.last(), Some(&notified));
}

#[test]
fn test_details_survive_restart() {
    let dir = TempDir::new().unwrap();
    let details = Details::new()
        .with("confirmed", true)
        .with("visits", 12)
        .with("largest", i64::MAX)
        .with("weight", 61.5)
        .with("height", 2.0)
        .with("note", "fasting, \"strict\"\nsecond line")
        .with("bmi", f64::NAN)
        .with("ceiling", f64::INFINITY)
        .with(
            "address",
            Details::new()
                .with("city", "Lyon")
                .with("floor", 3)
                .with("geo", Details::new().with("lat", 45.76)),
        );
    let record = RecordDraft::new(AuditAction::Update, "patient")
        .entity_id("p-9")
        .details(details)
        .into_record(Some(admin()), Default::default());

    {
        let trail = AuditTrail::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
        assert!(trail.append(record.clone()).persisted);
    }

    let reopened = AuditTrail::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
    let restored = reopened.store().all();
    assert_eq!(restored, vec![record]);

    let details = restored[0].details();
    assert_eq!(details.get("height"), Some(&DetailValue::Float(2.0)));
    assert_eq!(details.get("largest"), Some(&DetailValue::Int(i64::MAX)));
    assert_eq!(details.get("bmi"), Some(&DetailValue::Text("NaN".into())));
    assert!(matches!(details.get("address"), Some(DetailValue::Map(m)) if m.len() == 3));
}

proptest! {
    #[test]
    fn prop_query_is_newest_first(offsets in prop::collection::vec(-10_000i64..10_000, 0..60)) {
        let records: Vec<EventRecord> = offsets
            .iter()
            .map(|m| record_at(AuditAction::Update, "patient", *m))
            .collect();

        let sorted = query(&records, &AuditQuery::new());
        prop_assert_eq!(sorted.len(), records.len());
        prop_assert!(timestamps_descending(&sorted));
    }

    #[test]
    fn prop_retention_keeps_newest(ceiling in 1usize..40, extra in 0usize..40) {
        let store = RetentionStore::new(Arc::new(MemoryStorage::new()), ceiling);
        let appended: Vec<EventRecord> = (0..ceiling + extra)
            .map(|n| record_at(AuditAction::Create, "patient", n as i64))
            .collect();

        for record in &appended {
            store.append(record.clone());
        }

        let retained = store.all();
        prop_assert_eq!(retained.len(), ceiling);
        prop_assert_eq!(&retained[..], &appended[extra..]);
    }
}
