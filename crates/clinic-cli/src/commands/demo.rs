//! `clinic-audit demo` command implementation
//!
//! Starts an in-memory clinic, binds the audit layer to it through the ready
//! channel, and plays a short front-desk and doctor session.

use clinic_audit::{ready_channel, AuditTrail, Collaborator, EventRecord};
use colored::Colorize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::info;

use crate::clinic::{clinic_layer, ClinicData};
use crate::error::{CliError, Result};

type Feed = Option<broadcast::Receiver<EventRecord>>;

/// Run the scripted session against `trail`
pub async fn run(trail: Arc<AuditTrail>, watch: bool, bind_timeout: Option<Duration>) -> Result<()> {
    let mut feed: Feed = watch.then(|| trail.subscribe());
    let before = trail.store().len();

    let clinic = Arc::new(ClinicData::with_demo_staff());
    let layer = clinic_layer(trail.clone(), clinic.clone());
    let (publisher, pending) = ready_channel();

    let binder = tokio::spawn(async move { layer.attach_when_ready(pending, bind_timeout).await });

    // The data manager announces itself once its own startup is done
    publisher.publish(Collaborator::from_manager(clinic));
    let ops = binder
        .await
        .map_err(anyhow::Error::from)?
        .ok_or(CliError::NotReady)?;

    println!("{}", "Clinic demo session".cyan().bold());
    println!("===================");

    step(&ops, &mut feed, "Front desk signs in", "login", json!({"userId": "u-300"}))?;
    let patient = step(
        &ops,
        &mut feed,
        "Register patient",
        "addPatient",
        json!({"name": "Jane Doe", "phone": "555-0142", "dateOfBirth": "1984-07-12"}),
    )?;
    let appointment = step(
        &ops,
        &mut feed,
        "Book appointment",
        "addAppointment",
        json!({
            "patientId": patient["id"],
            "date": "2024-06-03",
            "time": "09:30",
            "reason": "Annual check-up, fasting bloodwork",
        }),
    )?;

    match ops.invoke(
        "addAppointment",
        &json!({"patientId": "pat-9999", "date": "2024-06-03", "time": "10:00"}),
    ) {
        Ok(_) => println!("{} Booking for unknown patient accepted", "!".yellow()),
        Err(e) => println!("{} Booking for unknown patient rejected: {}", "✗".red(), e),
    }

    step(&ops, &mut feed, "Front desk signs out", "logout", json!({}))?;
    step(&ops, &mut feed, "Doctor signs in", "login", json!({"userId": "u-100"}))?;
    step(
        &ops,
        &mut feed,
        "Complete appointment",
        "updateAppointment",
        json!({"id": appointment["id"], "status": "completed"}),
    )?;
    step(
        &ops,
        &mut feed,
        "Correct phone number",
        "updatePatient",
        json!({"id": patient["id"], "phone": "555-0199"}),
    )?;
    step(
        &ops,
        &mut feed,
        "Remove appointment",
        "deleteAppointment",
        json!({"id": appointment["id"]}),
    )?;
    step(&ops, &mut feed, "Remove patient", "deletePatient", json!({"id": patient["id"]}))?;
    step(&ops, &mut feed, "Doctor signs out", "logout", json!({}))?;

    let recorded = trail.store().len().saturating_sub(before);
    info!(recorded, "Demo session finished");
    println!();
    println!("{} Recorded {} audit events", "✓".green().bold(), recorded);

    Ok(())
}

fn step(
    ops: &Collaborator,
    feed: &mut Feed,
    label: &str,
    operation: &str,
    args: JsonValue,
) -> Result<JsonValue> {
    let result = ops.invoke(operation, &args)?;
    println!("{} {}", "→".cyan(), label);

    if let Some(rx) = feed.as_mut() {
        drain(rx);
    }
    Ok(result)
}

fn drain(rx: &mut broadcast::Receiver<EventRecord>) {
    loop {
        match rx.try_recv() {
            Ok(record) => println!(
                "  {} {} {} {}",
                "●".green(),
                record.action().as_str().bold(),
                record.entity_type(),
                record.entity_id().unwrap_or_default().dimmed()
            ),
            Err(TryRecvError::Lagged(missed)) => {
                println!("  {} {} events not shown", "…".yellow(), missed)
            },
            Err(_) => break,
        }
    }
}
