use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Doctor, Slot, Specialization, STORE_DATETIME_FORMAT};

const SLOT_COLUMNS: &str = "date_slot, doctor_name, specialization, is_available, patient_to_attend";

fn store_date_time(dt: &NaiveDateTime) -> String {
    dt.format(STORE_DATETIME_FORMAT).to_string()
}

fn store_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ── Slots ──

pub fn insert_slot(conn: &Connection, slot: &Slot) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO slots (date_slot, doctor_name, specialization, is_available, patient_to_attend)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(date_slot, doctor_name) DO UPDATE SET
           specialization = excluded.specialization,
           is_available = excluded.is_available,
           patient_to_attend = excluded.patient_to_attend",
        params![
            store_date_time(&slot.date_time),
            slot.doctor.as_str(),
            slot.specialization.as_str(),
            slot.is_available,
            slot.patient_to_attend,
        ],
    )?;
    Ok(())
}

pub fn count_slots(conn: &Connection) -> anyhow::Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM slots", [], |row| row.get(0))?;
    Ok(count)
}

pub fn get_all_slots(conn: &Connection) -> anyhow::Result<Vec<Slot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots ORDER BY date_slot ASC, doctor_name ASC"
    ))?;

    let rows = stmt.query_map([], |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn get_slot(
    conn: &Connection,
    date_time: &NaiveDateTime,
    doctor: Doctor,
) -> anyhow::Result<Option<Slot>> {
    let slot = conn
        .query_row(
            &format!("SELECT {SLOT_COLUMNS} FROM slots WHERE date_slot = ?1 AND doctor_name = ?2"),
            params![store_date_time(date_time), doctor.as_str()],
            |row| Ok(parse_slot_row(row)),
        )
        .optional()?;
    slot.transpose()
}

pub fn get_available_slots_for_doctor(
    conn: &Connection,
    date: &NaiveDate,
    doctor: Doctor,
) -> anyhow::Result<Vec<Slot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots
         WHERE substr(date_slot, 1, 10) = ?1 AND doctor_name = ?2 AND is_available = 1
         ORDER BY date_slot ASC"
    ))?;

    let rows = stmt.query_map(params![store_date(date), doctor.as_str()], |row| {
        Ok(parse_slot_row(row))
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn get_available_slots_for_specialization(
    conn: &Connection,
    date: &NaiveDate,
    specialization: Specialization,
) -> anyhow::Result<Vec<Slot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots
         WHERE substr(date_slot, 1, 10) = ?1 AND specialization = ?2 AND is_available = 1
         ORDER BY doctor_name ASC, date_slot ASC"
    ))?;

    let rows = stmt.query_map(params![store_date(date), specialization.as_str()], |row| {
        Ok(parse_slot_row(row))
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn get_slots_for_patient(conn: &Connection, patient_id: i64) -> anyhow::Result<Vec<Slot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots WHERE patient_to_attend = ?1 ORDER BY date_slot ASC"
    ))?;

    let rows = stmt.query_map(params![patient_id], |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

/// Assigns an available slot to a patient. Returns false when no available
/// row matches, which includes a slot that is already taken.
pub fn reserve_slot(
    conn: &Connection,
    date_time: &NaiveDateTime,
    doctor: Doctor,
    patient_id: i64,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE slots SET is_available = 0, patient_to_attend = ?1
         WHERE date_slot = ?2 AND doctor_name = ?3 AND is_available = 1",
        params![patient_id, store_date_time(date_time), doctor.as_str()],
    )?;
    Ok(count > 0)
}

/// Frees a slot held by the given patient. Returns false when the patient
/// holds no such slot.
pub fn release_slot(
    conn: &Connection,
    date_time: &NaiveDateTime,
    doctor: Doctor,
    patient_id: i64,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE slots SET is_available = 1, patient_to_attend = NULL
         WHERE date_slot = ?1 AND doctor_name = ?2 AND patient_to_attend = ?3",
        params![store_date_time(date_time), doctor.as_str(), patient_id],
    )?;
    Ok(count > 0)
}

pub fn is_slot_available(
    conn: &Connection,
    date_time: &NaiveDateTime,
    doctor: Doctor,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM slots WHERE date_slot = ?1 AND doctor_name = ?2 AND is_available = 1",
        params![store_date_time(date_time), doctor.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_slot_row(row: &rusqlite::Row) -> anyhow::Result<Slot> {
    let date_slot: String = row.get(0)?;
    let doctor_name: String = row.get(1)?;
    let specialization: String = row.get(2)?;
    let is_available: bool = row.get(3)?;
    let patient_to_attend: Option<i64> = row.get(4)?;

    let date_time = NaiveDateTime::parse_from_str(&date_slot, STORE_DATETIME_FORMAT)
        .with_context(|| format!("invalid date_slot in store: {date_slot}"))?;
    let doctor = Doctor::parse(&doctor_name)
        .ok_or_else(|| anyhow::anyhow!("unknown doctor in store: {doctor_name}"))?;
    let specialization = Specialization::parse(&specialization)
        .ok_or_else(|| anyhow::anyhow!("unknown specialization in store: {specialization}"))?;

    Ok(Slot {
        date_time,
        doctor,
        specialization,
        is_available,
        patient_to_attend,
    })
}
