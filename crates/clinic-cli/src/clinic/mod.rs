//! In-memory clinic data manager
//!
//! Holds staff, patients and appointments for the demo session and exposes
//! its mutating operations through an [`OperationRegistry`].

pub mod tracking;

pub use tracking::clinic_layer;

use clinic_audit::{Actor, DataManager, OperationError, OperationRegistry, SessionSource};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub date: String,
    pub time: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn default_status() -> String {
    "scheduled".to_string()
}

#[derive(Default)]
struct ClinicState {
    session: Option<Actor>,
    patients: BTreeMap<String, Patient>,
    appointments: BTreeMap<String, Appointment>,
    next_id: u32,
}

impl ClinicState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

/// Clinic records held in memory
pub struct ClinicData {
    staff: Vec<Actor>,
    state: Mutex<ClinicState>,
}

impl ClinicData {
    pub fn new(staff: Vec<Actor>) -> Self {
        Self {
            staff,
            state: Mutex::new(ClinicState::default()),
        }
    }

    /// Clinic with a small fixed staff roster
    pub fn with_demo_staff() -> Self {
        Self::new(vec![
            Actor::new("u-100", "Dr. Meredith Grey", "doctor"),
            Actor::new("u-200", "Carla Espinosa", "nurse"),
            Actor::new("u-300", "Front Desk", "receptionist"),
        ])
    }

    fn lock(&self) -> MutexGuard<'_, ClinicState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn patient(&self, id: &str) -> Option<Patient> {
        self.lock().patients.get(id).cloned()
    }

    pub fn appointment(&self, id: &str) -> Option<Appointment> {
        self.lock().appointments.get(id).cloned()
    }

    pub fn patient_count(&self) -> usize {
        self.lock().patients.len()
    }

    fn login(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let user_id = required_str(args, "userId")?;
        let Some(actor) = self.staff.iter().find(|a| a.id == user_id).cloned() else {
            return Ok(JsonValue::Null);
        };

        self.lock().session = Some(actor.clone());
        debug!(user = %actor.id, "Signed in");
        Ok(serde_json::to_value(actor).unwrap_or(JsonValue::Bool(true)))
    }

    fn logout(&self) -> Result<JsonValue, OperationError> {
        Ok(JsonValue::Bool(self.lock().session.take().is_some()))
    }

    fn add_patient(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let name = required_str(args, "name")?;
        let mut state = self.lock();
        let patient = Patient {
            id: state.next_id("pat"),
            name: name.to_string(),
            phone: optional_str(args, "phone"),
            date_of_birth: optional_str(args, "dateOfBirth"),
        };
        state.patients.insert(patient.id.clone(), patient.clone());
        to_json(&patient)
    }

    fn update_patient(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let id = required_str(args, "id")?;
        let mut state = self.lock();
        let Some(patient) = state.patients.get_mut(id) else {
            return Ok(JsonValue::Null);
        };

        if let Some(name) = optional_str(args, "name") {
            patient.name = name;
        }
        if let Some(phone) = optional_str(args, "phone") {
            patient.phone = Some(phone);
        }
        if let Some(dob) = optional_str(args, "dateOfBirth") {
            patient.date_of_birth = Some(dob);
        }
        to_json(&*patient)
    }

    /// Removes the patient together with their appointments
    fn delete_patient(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let id = required_str(args, "id")?;
        let mut state = self.lock();
        let removed = state.patients.remove(id).is_some();
        if removed {
            state.appointments.retain(|_, a| a.patient_id != id);
        }
        Ok(JsonValue::Bool(removed))
    }

    fn add_appointment(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let patient_id = required_str(args, "patientId")?;
        let mut state = self.lock();
        if !state.patients.contains_key(patient_id) {
            return Err(OperationError::not_found("patient", patient_id));
        }

        let appointment = Appointment {
            id: state.next_id("apt"),
            patient_id: patient_id.to_string(),
            date: required_str(args, "date")?.to_string(),
            time: required_str(args, "time")?.to_string(),
            status: optional_str(args, "status").unwrap_or_else(default_status),
            reason: optional_str(args, "reason"),
        };
        state
            .appointments
            .insert(appointment.id.clone(), appointment.clone());
        to_json(&appointment)
    }

    fn update_appointment(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let id = required_str(args, "id")?;
        let mut state = self.lock();
        let Some(appointment) = state.appointments.get_mut(id) else {
            return Ok(JsonValue::Null);
        };

        if let Some(date) = optional_str(args, "date") {
            appointment.date = date;
        }
        if let Some(time) = optional_str(args, "time") {
            appointment.time = time;
        }
        if let Some(status) = optional_str(args, "status") {
            appointment.status = status;
        }
        if let Some(reason) = optional_str(args, "reason") {
            appointment.reason = Some(reason);
        }
        to_json(&*appointment)
    }

    fn delete_appointment(&self, args: &JsonValue) -> Result<JsonValue, OperationError> {
        let id = required_str(args, "id")?;
        Ok(JsonValue::Bool(self.lock().appointments.remove(id).is_some()))
    }
}

impl SessionSource for ClinicData {
    fn current_user(&self) -> Option<Actor> {
        self.lock().session.clone()
    }
}

impl DataManager for ClinicData {
    fn operations(self: Arc<Self>) -> OperationRegistry {
        let mut registry = OperationRegistry::new();

        let clinic = self.clone();
        registry.insert("login", move |args: &JsonValue| clinic.login(args));
        let clinic = self.clone();
        registry.insert("logout", move |_: &JsonValue| clinic.logout());
        let clinic = self.clone();
        registry.insert("addPatient", move |args: &JsonValue| clinic.add_patient(args));
        let clinic = self.clone();
        registry.insert("updatePatient", move |args: &JsonValue| clinic.update_patient(args));
        let clinic = self.clone();
        registry.insert("deletePatient", move |args: &JsonValue| clinic.delete_patient(args));
        let clinic = self.clone();
        registry.insert("addAppointment", move |args: &JsonValue| clinic.add_appointment(args));
        let clinic = self.clone();
        registry.insert("updateAppointment", move |args: &JsonValue| {
            clinic.update_appointment(args)
        });
        let clinic = self;
        registry.insert("deleteAppointment", move |args: &JsonValue| {
            clinic.delete_appointment(args)
        });

        registry
    }
}

fn required_str<'a>(args: &'a JsonValue, field: &str) -> Result<&'a str, OperationError> {
    args.get(field)
        .and_then(JsonValue::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| OperationError::invalid(format!("'{}' is required", field)))
}

fn optional_str(args: &JsonValue, field: &str) -> Option<String> {
    args.get(field).and_then(JsonValue::as_str).map(str::to_string)
}

fn to_json<T: Serialize>(value: &T) -> Result<JsonValue, OperationError> {
    serde_json::to_value(value).map_err(|e| OperationError::Rejected(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clinic_audit::Collaborator;
    use serde_json::json;

    fn clinic() -> (Arc<ClinicData>, Collaborator) {
        let data = Arc::new(ClinicData::with_demo_staff());
        let collaborator = Collaborator::from_manager(data.clone());
        (data, collaborator)
    }

    #[test]
    fn test_login_sets_session() {
        let (data, ops) = clinic();
        assert!(data.current_user().is_none());

        let result = ops.invoke("login", &json!({"userId": "u-200"})).unwrap();
        assert_eq!(result["role"], "nurse");
        assert_eq!(data.current_user().map(|a| a.id), Some("u-200".to_string()));

        assert_eq!(ops.invoke("logout", &json!({})).unwrap(), json!(true));
        assert_eq!(ops.invoke("logout", &json!({})).unwrap(), json!(false));
    }

    #[test]
    fn test_unknown_staff_cannot_login() {
        let (_, ops) = clinic();
        assert_eq!(ops.invoke("login", &json!({"userId": "nobody"})).unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_patient_lifecycle() {
        let (data, ops) = clinic();
        let created = ops
            .invoke("addPatient", &json!({"name": "Jane Doe", "phone": "555-0101"}))
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let updated = ops
            .invoke("updatePatient", &json!({"id": id, "phone": "555-0199"}))
            .unwrap();
        assert_eq!(updated["phone"], "555-0199");
        assert_eq!(updated["name"], "Jane Doe");

        assert_eq!(ops.invoke("deletePatient", &json!({"id": id})).unwrap(), json!(true));
        assert_eq!(data.patient_count(), 0);
        assert_eq!(
            ops.invoke("updatePatient", &json!({"id": id})).unwrap(),
            JsonValue::Null
        );
    }

    #[test]
    fn test_appointment_requires_known_patient() {
        let (_, ops) = clinic();
        let err = ops
            .invoke(
                "addAppointment",
                &json!({"patientId": "pat-9999", "date": "2024-06-01", "time": "09:30"}),
            )
            .unwrap_err();
        assert_eq!(err, OperationError::not_found("patient", "pat-9999"));
    }

    #[test]
    fn test_deleting_patient_removes_appointments() {
        let (data, ops) = clinic();
        let patient = ops.invoke("addPatient", &json!({"name": "Sam"})).unwrap();
        let appointment = ops
            .invoke(
                "addAppointment",
                &json!({"patientId": patient["id"], "date": "2024-06-01", "time": "10:00"}),
            )
            .unwrap();
        assert_eq!(appointment["status"], "scheduled");

        ops.invoke("deletePatient", &json!({"id": patient["id"]})).unwrap();
        assert!(data.appointment(appointment["id"].as_str().unwrap()).is_none());
    }

    #[test]
    fn test_missing_required_field() {
        let (_, ops) = clinic();
        let err = ops.invoke("addPatient", &json!({"phone": "555"})).unwrap_err();
        assert!(matches!(err, OperationError::InvalidArguments(_)));
    }
}
