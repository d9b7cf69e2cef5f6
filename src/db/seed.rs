use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::models::{Doctor, Slot, Specialization};

/// Column layout of the availability spreadsheet.
#[derive(Debug, Serialize, Deserialize)]
struct SlotRecord {
    date_slot: String,
    specialization: String,
    doctor_name: String,
    is_available: String,
    patient_to_attend: Option<String>,
}

/// Imports the spreadsheet only when the store holds no rows yet.
pub fn seed_if_empty(conn: &Connection, path: &Path) -> anyhow::Result<usize> {
    if queries::count_slots(conn)? > 0 {
        return Ok(0);
    }
    if !path.exists() {
        tracing::warn!(path = %path.display(), "availability seed file not found, store left empty");
        return Ok(0);
    }

    let file = fs::File::open(path)
        .with_context(|| format!("failed to open seed file: {}", path.display()))?;
    let count = import_from_reader(conn, file)?;
    tracing::info!(count, path = %path.display(), "seeded availability store");
    Ok(count)
}

/// Upserts every row of the CSV in a single transaction.
pub fn import_from_reader<R: Read>(conn: &Connection, reader: R) -> anyhow::Result<usize> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let tx = conn
        .unchecked_transaction()
        .context("failed to start import transaction")?;

    let mut count = 0;
    for (line, record) in rdr.deserialize::<SlotRecord>().enumerate() {
        let record = record.with_context(|| format!("malformed CSV row {}", line + 2))?;
        let slot = record_to_slot(&record).with_context(|| format!("invalid CSV row {}", line + 2))?;
        queries::insert_slot(&tx, &slot)?;
        count += 1;
    }

    tx.commit().context("failed to commit import")?;
    Ok(count)
}

pub fn export_to_string(conn: &Connection) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for slot in queries::get_all_slots(conn)? {
        wtr.serialize(slot_to_record(&slot))?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    Ok(String::from_utf8(bytes)?)
}

/// Rewrites the whole file. Goes through a sibling temp file so readers never
/// observe a half-written table.
pub fn export_to_file(conn: &Connection, path: &Path) -> anyhow::Result<()> {
    let csv = export_to_string(conn)?;
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, csv).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Accepts both `DD-MM-YYYY H.MM` (spreadsheet form) and `DD-MM-YYYY HH:MM`.
pub fn parse_sheet_date_time(s: &str) -> anyhow::Result<NaiveDateTime> {
    let (date, time) = s
        .trim()
        .split_once(' ')
        .ok_or_else(|| anyhow::anyhow!("missing time in date_slot: {s}"))?;
    let normalized = format!("{date} {}", time.trim().replace('.', ":"));
    NaiveDateTime::parse_from_str(&normalized, "%d-%m-%Y %H:%M")
        .with_context(|| format!("invalid date_slot: {s}"))
}

pub fn format_sheet_date_time(dt: &NaiveDateTime) -> String {
    dt.format("%d-%m-%Y %-H.%M").to_string()
}

fn parse_sheet_bool(s: &str) -> anyhow::Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow::anyhow!("invalid is_available value: {other}")),
    }
}

// Spreadsheet tools write integer columns with gaps as floats ("1000082.0").
fn parse_sheet_patient(s: Option<&str>) -> anyhow::Result<Option<i64>> {
    let Some(raw) = s.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let digits = raw.strip_suffix(".0").unwrap_or(raw);
    let id = digits
        .parse::<i64>()
        .with_context(|| format!("invalid patient_to_attend: {raw}"))?;
    Ok(Some(id))
}

fn record_to_slot(record: &SlotRecord) -> anyhow::Result<Slot> {
    let date_time = parse_sheet_date_time(&record.date_slot)?;
    let doctor = Doctor::parse(&record.doctor_name)
        .ok_or_else(|| anyhow::anyhow!("unknown doctor: {}", record.doctor_name))?;
    let specialization = Specialization::parse(&record.specialization)
        .ok_or_else(|| anyhow::anyhow!("unknown specialization: {}", record.specialization))?;
    let is_available = parse_sheet_bool(&record.is_available)?;
    let patient = parse_sheet_patient(record.patient_to_attend.as_deref())?;

    match (is_available, patient) {
        (true, _) => Ok(Slot::open(date_time, doctor, specialization)),
        (false, Some(id)) => Ok(Slot::booked(date_time, doctor, specialization, id)),
        (false, None) => Err(anyhow::anyhow!(
            "slot {} for {} is unavailable but has no patient",
            record.date_slot,
            record.doctor_name
        )),
    }
}

fn slot_to_record(slot: &Slot) -> SlotRecord {
    SlotRecord {
        date_slot: format_sheet_date_time(&slot.date_time),
        specialization: slot.specialization.as_str().to_string(),
        doctor_name: slot.doctor.as_str().to_string(),
        is_available: if slot.is_available { "True" } else { "False" }.to_string(),
        patient_to_attend: slot.patient_to_attend.map(|id| id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    const SHEET: &str = "date_slot,specialization,doctor_name,is_available,patient_to_attend
05-08-2024 8.00,orthodontist,jane smith,True,
05-08-2024 8.30,orthodontist,jane smith,False,1000082.0
05-08-2024 13:00,oral_surgeon,john doe,true,
";

    #[test]
    fn test_import_sheet_formats() {
        let conn = db::init_db(":memory:").unwrap();
        let count = import_from_reader(&conn, SHEET.as_bytes()).unwrap();
        assert_eq!(count, 3);

        let slots = queries::get_all_slots(&conn).unwrap();
        assert_eq!(slots[0].date_time.format("%H:%M").to_string(), "08:00");
        assert!(slots[0].is_available);
        assert_eq!(slots[1].patient_to_attend, Some(1000082));
        assert_eq!(slots[2].doctor, Doctor::JohnDoe);
    }

    #[test]
    fn test_import_rejects_inconsistent_row() {
        let conn = db::init_db(":memory:").unwrap();
        let sheet = "date_slot,specialization,doctor_name,is_available,patient_to_attend
05-08-2024 8.00,orthodontist,jane smith,False,
";
        assert!(import_from_reader(&conn, sheet.as_bytes()).is_err());
        // nothing committed
        assert_eq!(queries::count_slots(&conn).unwrap(), 0);
    }

    #[test]
    fn test_export_uses_sheet_format() {
        let conn = db::init_db(":memory:").unwrap();
        import_from_reader(&conn, SHEET.as_bytes()).unwrap();

        let csv = export_to_string(&conn).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("date_slot,specialization,doctor_name,is_available,patient_to_attend")
        );
        assert!(csv.contains("05-08-2024 8.00,orthodontist,jane smith,True,"));
        assert!(csv.contains("05-08-2024 8.30,orthodontist,jane smith,False,1000082"));
        assert!(csv.contains("05-08-2024 13.00,oral_surgeon,john doe,True,"));
    }

    #[test]
    fn test_export_file_then_seed_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("availability.csv");

        let conn = db::init_db(":memory:").unwrap();
        import_from_reader(&conn, SHEET.as_bytes()).unwrap();
        export_to_file(&conn, &path).unwrap();

        let fresh = db::init_db(":memory:").unwrap();
        assert_eq!(seed_if_empty(&fresh, &path).unwrap(), 3);
        // second call is a no-op once rows exist
        assert_eq!(seed_if_empty(&fresh, &path).unwrap(), 0);
        assert_eq!(
            queries::get_all_slots(&fresh).unwrap(),
            queries::get_all_slots(&conn).unwrap()
        );
    }

    #[test]
    fn test_seed_missing_file_is_not_fatal() {
        let conn = db::init_db(":memory:").unwrap();
        let count = seed_if_empty(&conn, Path::new("does/not/exist.csv")).unwrap();
        assert_eq!(count, 0);
    }
}
