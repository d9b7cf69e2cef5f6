use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::db::seed;
use crate::models::{
    AppointmentDate, AppointmentDateTime, Doctor, PatientId, Specialization, ValidationError,
};
use crate::services::ai::structured::parse_json;
use crate::services::{availability, booking};

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    CheckAvailabilityByDoctor,
    CheckAvailabilityBySpecialization,
    SetAppointment,
    CancelAppointment,
    RescheduleAppointment,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        self.spec().name
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "check_availability_by_doctor" => Some(Tool::CheckAvailabilityByDoctor),
            "check_availability_by_specialization" => Some(Tool::CheckAvailabilityBySpecialization),
            "set_appointment" => Some(Tool::SetAppointment),
            "cancel_appointment" => Some(Tool::CancelAppointment),
            "reschedule_appointment" => Some(Tool::RescheduleAppointment),
            _ => None,
        }
    }

    pub fn spec(&self) -> ToolSpec {
        match self {
            Tool::CheckAvailabilityByDoctor => ToolSpec {
                name: "check_availability_by_doctor",
                description: "Check availability for a specific doctor on a given date.",
                arguments: r#"{"desired_date": "DD-MM-YYYY", "doctor_name": "<doctor>"}"#,
            },
            Tool::CheckAvailabilityBySpecialization => ToolSpec {
                name: "check_availability_by_specialization",
                description: "Check availability for doctors by specialization on a given date.",
                arguments: r#"{"desired_date": "DD-MM-YYYY", "specialization": "<specialization>"}"#,
            },
            Tool::SetAppointment => ToolSpec {
                name: "set_appointment",
                description: "Set an appointment for a patient with a doctor at a specific datetime.",
                arguments: r#"{"desired_date": "DD-MM-YYYY HH:MM", "id_number": 1234567, "doctor_name": "<doctor>"}"#,
            },
            Tool::CancelAppointment => ToolSpec {
                name: "cancel_appointment",
                description: "Cancel an existing appointment.",
                arguments: r#"{"date": "DD-MM-YYYY HH:MM", "id_number": 1234567, "doctor_name": "<doctor>"}"#,
            },
            Tool::RescheduleAppointment => ToolSpec {
                name: "reschedule_appointment",
                description: "Reschedule an existing appointment to a new datetime.",
                arguments: r#"{"old_date": "DD-MM-YYYY HH:MM", "new_date": "DD-MM-YYYY HH:MM", "id_number": 1234567, "doctor_name": "<doctor>"}"#,
            },
        }
    }
}

/// A worker's turn: either it wants a tool run or it is done.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerTurn {
    Call(ToolCall),
    Reply(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl WorkerTurn {
    pub fn parse(reply: &str) -> Self {
        match parse_json::<ToolCall>(reply) {
            Some(call) => WorkerTurn::Call(call),
            None => WorkerTurn::Reply(reply.trim().to_string()),
        }
    }
}

// Models send the id both as a number and as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatientNumber {
    Int(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct DoctorAvailabilityArgs {
    desired_date: String,
    doctor_name: String,
}

#[derive(Debug, Deserialize)]
struct SpecializationAvailabilityArgs {
    desired_date: String,
    specialization: String,
}

#[derive(Debug, Deserialize)]
struct SetAppointmentArgs {
    desired_date: String,
    id_number: Option<PatientNumber>,
    doctor_name: String,
}

#[derive(Debug, Deserialize)]
struct CancelAppointmentArgs {
    #[serde(alias = "desired_date")]
    date: String,
    id_number: Option<PatientNumber>,
    doctor_name: String,
}

#[derive(Debug, Deserialize)]
struct RescheduleAppointmentArgs {
    old_date: String,
    new_date: String,
    id_number: Option<PatientNumber>,
    doctor_name: String,
}

/// Everything a tool needs to touch the availability store on behalf of one
/// patient.
pub struct ToolContext<'a> {
    pub db: &'a Mutex<Connection>,
    pub patient: PatientId,
    pub export_path: Option<&'a Path>,
}

#[derive(Debug, thiserror::Error)]
enum ToolError {
    /// Bad arguments. The text goes back to the model so it can correct itself.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<ValidationError> for ToolError {
    fn from(e: ValidationError) -> Self {
        ToolError::Rejected(e.to_string())
    }
}

impl ToolContext<'_> {
    /// Runs one tool call. Bad arguments come back as `Ok` text for the
    /// model; only store failures are errors.
    pub fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let Some(tool) = Tool::parse(&call.tool) else {
            return Ok(format!("Unknown tool: {}", call.tool));
        };

        tracing::info!(tool = tool.as_str(), arguments = %call.arguments, "tool call");

        let result = match tool {
            Tool::CheckAvailabilityByDoctor => self.check_by_doctor(&call.arguments),
            Tool::CheckAvailabilityBySpecialization => self.check_by_specialization(&call.arguments),
            Tool::SetAppointment => self.set(&call.arguments),
            Tool::CancelAppointment => self.cancel(&call.arguments),
            Tool::RescheduleAppointment => self.reschedule(&call.arguments),
        };

        let text = match result {
            Ok(text) => text,
            Err(ToolError::Rejected(text)) => text,
            Err(ToolError::Store(e)) => return Err(e),
        };
        tracing::info!(tool = tool.as_str(), result = %text, "tool result");
        Ok(text)
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("availability store lock poisoned"))
    }

    fn check_by_doctor(&self, raw: &serde_json::Value) -> Result<String, ToolError> {
        let args: DoctorAvailabilityArgs = parse_args(Tool::CheckAvailabilityByDoctor, raw)?;
        let date = AppointmentDate::parse(&args.desired_date)?;
        let doctor = parse_doctor(&args.doctor_name)?;

        let db = self.lock()?;
        let report = availability::availability_by_doctor(&db, &date, doctor)?;
        Ok(report.to_string())
    }

    fn check_by_specialization(&self, raw: &serde_json::Value) -> Result<String, ToolError> {
        let args: SpecializationAvailabilityArgs =
            parse_args(Tool::CheckAvailabilityBySpecialization, raw)?;
        let date = AppointmentDate::parse(&args.desired_date)?;
        let specialization = Specialization::parse(&args.specialization).ok_or_else(|| {
            let known = Specialization::ALL.map(|s| s.as_str()).join(", ");
            ToolError::Rejected(format!(
                "Unknown specialization: {}. Known specializations: {known}",
                args.specialization
            ))
        })?;

        let db = self.lock()?;
        let report = availability::availability_by_specialization(&db, &date, specialization)?;
        Ok(report.to_string())
    }

    fn set(&self, raw: &serde_json::Value) -> Result<String, ToolError> {
        let args: SetAppointmentArgs = parse_args(Tool::SetAppointment, raw)?;
        let at = AppointmentDateTime::parse(&args.desired_date)?;
        let patient = self.patient_for(args.id_number.as_ref())?;
        let doctor = parse_doctor(&args.doctor_name)?;

        let db = self.lock()?;
        let outcome = booking::set_appointment(&db, &at, patient, doctor)?;
        if outcome.is_mutation() {
            self.mirror(&db);
        }
        Ok(outcome.to_string())
    }

    fn cancel(&self, raw: &serde_json::Value) -> Result<String, ToolError> {
        let args: CancelAppointmentArgs = parse_args(Tool::CancelAppointment, raw)?;
        let at = AppointmentDateTime::parse(&args.date)?;
        let patient = self.patient_for(args.id_number.as_ref())?;
        let doctor = parse_doctor(&args.doctor_name)?;

        let db = self.lock()?;
        let outcome = booking::cancel_appointment(&db, &at, patient, doctor)?;
        if outcome.is_mutation() {
            self.mirror(&db);
        }
        Ok(outcome.to_string())
    }

    fn reschedule(&self, raw: &serde_json::Value) -> Result<String, ToolError> {
        let args: RescheduleAppointmentArgs = parse_args(Tool::RescheduleAppointment, raw)?;
        let old = AppointmentDateTime::parse(&args.old_date)?;
        let new = AppointmentDateTime::parse(&args.new_date)?;
        let patient = self.patient_for(args.id_number.as_ref())?;
        let doctor = parse_doctor(&args.doctor_name)?;

        let db = self.lock()?;
        let outcome = booking::reschedule_appointment(&db, &old, &new, patient, doctor)?;
        if outcome.is_mutation() {
            self.mirror(&db);
        }
        Ok(outcome.to_string())
    }

    /// The conversation belongs to one patient; a tool call may restate that
    /// id but never name another one.
    fn patient_for(&self, given: Option<&PatientNumber>) -> Result<PatientId, ToolError> {
        let value = match given {
            None => return Ok(self.patient),
            Some(PatientNumber::Int(n)) => *n,
            Some(PatientNumber::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::PatientId)?,
        };
        let id = PatientId::new(value)?;
        if id != self.patient {
            return Err(ToolError::Rejected(format!(
                "Appointments can only be managed for patient {}",
                self.patient
            )));
        }
        Ok(id)
    }

    fn mirror(&self, db: &Connection) {
        let Some(path) = self.export_path else {
            return;
        };
        if let Err(e) = seed::export_to_file(db, path) {
            tracing::error!(error = %e, path = %path.display(), "failed to mirror availability CSV");
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: Tool, raw: &serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(raw.clone()).map_err(|e| {
        ToolError::Rejected(format!(
            "Invalid arguments for {}: {e}. Expected {}",
            tool.as_str(),
            tool.spec().arguments
        ))
    })
}

fn parse_doctor(name: &str) -> Result<Doctor, ToolError> {
    Doctor::parse(name).ok_or_else(|| {
        let known = Doctor::ALL.map(|d| d.as_str()).join(", ");
        ToolError::Rejected(format!("Unknown doctor: {name}. Known doctors: {known}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, queries};
    use crate::models::Slot;
    use chrono::NaiveDateTime;
    use serde_json::json;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn setup_db() -> Mutex<Connection> {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_slot(
            &conn,
            &Slot::open(dt("2024-08-05 08:00"), Doctor::JaneSmith, Specialization::Orthodontist),
        )
        .unwrap();
        queries::insert_slot(
            &conn,
            &Slot::open(dt("2024-08-05 09:30"), Doctor::JaneSmith, Specialization::Orthodontist),
        )
        .unwrap();
        Mutex::new(conn)
    }

    fn ctx(db: &Mutex<Connection>) -> ToolContext<'_> {
        ToolContext {
            db,
            patient: PatientId::new(1000097).unwrap(),
            export_path: None,
        }
    }

    fn call(tool: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            tool: tool.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_parse_turn() {
        let turn = WorkerTurn::parse(
            r#"{"tool":"check_availability_by_doctor","arguments":{"desired_date":"05-08-2024","doctor_name":"jane smith"}}"#,
        );
        assert!(matches!(turn, WorkerTurn::Call(ref c) if c.tool == "check_availability_by_doctor"));

        let turn = WorkerTurn::parse("  Dr. Smith is free at 8:00.  ");
        assert_eq!(turn, WorkerTurn::Reply("Dr. Smith is free at 8:00.".to_string()));
    }

    #[test]
    fn test_check_by_doctor() {
        let db = setup_db();
        let out = ctx(&db)
            .execute(&call(
                "check_availability_by_doctor",
                json!({"desired_date": "05-08-2024", "doctor_name": "Dr. Jane Smith"}),
            ))
            .unwrap();
        assert_eq!(out, "Doctor availability for 05-08-2024\nAvailable slots: 08:00, 09:30");
    }

    #[test]
    fn test_bad_date_is_returned_to_model() {
        let db = setup_db();
        let out = ctx(&db)
            .execute(&call(
                "check_availability_by_doctor",
                json!({"desired_date": "2024-08-05", "doctor_name": "jane smith"}),
            ))
            .unwrap();
        assert_eq!(out, "Date must be in format 'DD-MM-YYYY'");
    }

    #[test]
    fn test_unknown_tool_and_doctor() {
        let db = setup_db();
        let out = ctx(&db).execute(&call("drop_table", json!({}))).unwrap();
        assert_eq!(out, "Unknown tool: drop_table");

        let out = ctx(&db)
            .execute(&call(
                "check_availability_by_doctor",
                json!({"desired_date": "05-08-2024", "doctor_name": "gregory house"}),
            ))
            .unwrap();
        assert!(out.starts_with("Unknown doctor: gregory house."));
    }

    #[test]
    fn test_missing_arguments() {
        let db = setup_db();
        let out = ctx(&db)
            .execute(&call("set_appointment", json!({"doctor_name": "jane smith"})))
            .unwrap();
        assert!(out.starts_with("Invalid arguments for set_appointment"));
    }

    #[test]
    fn test_set_accepts_string_id_and_rejects_other_patient() {
        let db = setup_db();
        let out = ctx(&db)
            .execute(&call(
                "set_appointment",
                json!({"desired_date": "05-08-2024 08:00", "id_number": "1000098", "doctor_name": "jane smith"}),
            ))
            .unwrap();
        assert_eq!(out, "Appointments can only be managed for patient 1000097");

        let out = ctx(&db)
            .execute(&call(
                "set_appointment",
                json!({"desired_date": "05-08-2024 08:00", "id_number": "1000097", "doctor_name": "jane smith"}),
            ))
            .unwrap();
        assert_eq!(out, "Appointment successfully set");
    }

    #[test]
    fn test_reschedule_via_tool() {
        let db = setup_db();
        let c = ctx(&db);
        c.execute(&call(
            "set_appointment",
            json!({"desired_date": "05-08-2024 08:00", "id_number": 1000097, "doctor_name": "jane smith"}),
        ))
        .unwrap();

        let out = c
            .execute(&call(
                "reschedule_appointment",
                json!({"old_date": "05-08-2024 08:00", "new_date": "05-08-2024 09:30", "doctor_name": "jane smith"}),
            ))
            .unwrap();
        assert_eq!(out, "Appointment successfully rescheduled");

        let out = c
            .execute(&call(
                "cancel_appointment",
                json!({"date": "05-08-2024 09:30", "id_number": 1000097, "doctor_name": "jane smith"}),
            ))
            .unwrap();
        assert_eq!(out, "Appointment successfully cancelled");
    }

    #[test]
    fn test_mutation_mirrors_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("availability.csv");
        let db = setup_db();
        let c = ToolContext {
            db: &db,
            patient: PatientId::new(1000097).unwrap(),
            export_path: Some(&path),
        };

        c.execute(&call(
            "set_appointment",
            json!({"desired_date": "05-08-2024 08:00", "doctor_name": "jane smith"}),
        ))
        .unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.contains("05-08-2024 8.00,orthodontist,jane smith,False,1000097"));
    }
}
