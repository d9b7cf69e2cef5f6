use std::fmt;

use anyhow::Context;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{AppointmentDateTime, Doctor, PatientId};

/// What a booking operation did. Failures to find a slot are outcomes the
/// model explains to the patient, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked,
    NoMatchingSlot,
    Cancelled,
    NoMatchingAppointment,
    Rescheduled,
    NoAvailableSlot,
}

impl BookingOutcome {
    /// True when the store was changed.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            BookingOutcome::Booked | BookingOutcome::Cancelled | BookingOutcome::Rescheduled
        )
    }
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BookingOutcome::Booked => "Appointment successfully set",
            BookingOutcome::NoMatchingSlot => "No available appointments for that particular case",
            BookingOutcome::Cancelled => "Appointment successfully cancelled",
            BookingOutcome::NoMatchingAppointment => {
                "You don't have any appointment matching those specifications"
            }
            BookingOutcome::Rescheduled => "Appointment successfully rescheduled",
            BookingOutcome::NoAvailableSlot => "No available slots at the desired time",
        };
        write!(f, "{msg}")
    }
}

pub fn set_appointment(
    conn: &Connection,
    at: &AppointmentDateTime,
    patient: PatientId,
    doctor: Doctor,
) -> anyhow::Result<BookingOutcome> {
    let reserved = queries::reserve_slot(conn, &at.date_time(), doctor, patient.value())?;
    if !reserved {
        return Ok(BookingOutcome::NoMatchingSlot);
    }

    tracing::info!(patient = %patient, doctor = doctor.as_str(), at = %at, "appointment set");
    Ok(BookingOutcome::Booked)
}

pub fn cancel_appointment(
    conn: &Connection,
    at: &AppointmentDateTime,
    patient: PatientId,
    doctor: Doctor,
) -> anyhow::Result<BookingOutcome> {
    let released = queries::release_slot(conn, &at.date_time(), doctor, patient.value())?;
    if !released {
        return Ok(BookingOutcome::NoMatchingAppointment);
    }

    tracing::info!(patient = %patient, doctor = doctor.as_str(), at = %at, "appointment cancelled");
    Ok(BookingOutcome::Cancelled)
}

/// Moves a patient's appointment in one transaction: either the old slot is
/// freed and the new one taken, or nothing changes.
pub fn reschedule_appointment(
    conn: &Connection,
    old: &AppointmentDateTime,
    new: &AppointmentDateTime,
    patient: PatientId,
    doctor: Doctor,
) -> anyhow::Result<BookingOutcome> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start reschedule transaction")?;

    if !queries::is_slot_available(&tx, &new.date_time(), doctor)? {
        return Ok(BookingOutcome::NoAvailableSlot);
    }

    if !queries::release_slot(&tx, &old.date_time(), doctor, patient.value())? {
        return Ok(BookingOutcome::NoMatchingAppointment);
    }

    if !queries::reserve_slot(&tx, &new.date_time(), doctor, patient.value())? {
        // dropping the transaction rolls the release back
        tracing::warn!(patient = %patient, "new slot vanished during reschedule, rolled back");
        return Ok(BookingOutcome::NoAvailableSlot);
    }

    tx.commit().context("failed to commit reschedule")?;

    tracing::info!(
        patient = %patient,
        doctor = doctor.as_str(),
        from = %old,
        to = %new,
        "appointment rescheduled"
    );
    Ok(BookingOutcome::Rescheduled)
}
