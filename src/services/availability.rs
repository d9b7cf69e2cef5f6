use std::fmt;

use chrono::{NaiveTime, Timelike};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{AppointmentDate, Doctor, Specialization};

pub const NO_AVAILABILITY: &str = "No availability in the entire day";

/// Result of an availability lookup. Renders to the text the workers hand
/// back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum AvailabilityReport {
    NoAvailability,
    Doctor {
        date: AppointmentDate,
        times: Vec<NaiveTime>,
    },
    Specialization {
        date: AppointmentDate,
        doctors: Vec<(Doctor, Vec<NaiveTime>)>,
    },
}

impl fmt::Display for AvailabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityReport::NoAvailability => write!(f, "{NO_AVAILABILITY}"),
            AvailabilityReport::Doctor { date, times } => {
                let slots = times
                    .iter()
                    .map(|t| t.format("%H:%M").to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Doctor availability for {date}\nAvailable slots: {slots}")
            }
            AvailabilityReport::Specialization { date, doctors } => {
                writeln!(f, "Doctor availability for {date}")?;
                for (doctor, times) in doctors {
                    let slots = times
                        .iter()
                        .map(to_am_pm)
                        .collect::<Vec<_>>()
                        .join(", \n");
                    writeln!(f, "{}. Available slots:\n{slots}", doctor.as_str())?;
                }
                Ok(())
            }
        }
    }
}

pub fn to_am_pm(time: &NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    let period = if is_pm { "PM" } else { "AM" };
    format!("{hour}:{:02} {period}", time.minute())
}

pub fn availability_by_doctor(
    conn: &Connection,
    date: &AppointmentDate,
    doctor: Doctor,
) -> anyhow::Result<AvailabilityReport> {
    let slots = queries::get_available_slots_for_doctor(conn, &date.date(), doctor)?;
    if slots.is_empty() {
        return Ok(AvailabilityReport::NoAvailability);
    }

    Ok(AvailabilityReport::Doctor {
        date: *date,
        times: slots.iter().map(|s| s.date_time.time()).collect(),
    })
}

pub fn availability_by_specialization(
    conn: &Connection,
    date: &AppointmentDate,
    specialization: Specialization,
) -> anyhow::Result<AvailabilityReport> {
    let slots =
        queries::get_available_slots_for_specialization(conn, &date.date(), specialization)?;
    if slots.is_empty() {
        return Ok(AvailabilityReport::NoAvailability);
    }

    // Rows arrive ordered by doctor, so grouping only needs to look at the tail.
    let mut doctors: Vec<(Doctor, Vec<NaiveTime>)> = Vec::new();
    for slot in slots {
        match doctors.last_mut() {
            Some((doctor, times)) if *doctor == slot.doctor => times.push(slot.date_time.time()),
            _ => doctors.push((slot.doctor, vec![slot.date_time.time()])),
        }
    }

    Ok(AvailabilityReport::Specialization {
        date: *date,
        doctors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Slot;
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        let rows = [
            Slot::open(dt("2024-08-05 08:00"), Doctor::JaneSmith, Specialization::Orthodontist),
            Slot::open(dt("2024-08-05 13:30"), Doctor::JaneSmith, Specialization::Orthodontist),
            Slot::booked(dt("2024-08-05 09:00"), Doctor::JaneSmith, Specialization::Orthodontist, 1000082),
            Slot::open(dt("2024-08-05 10:00"), Doctor::EmilyJohnson, Specialization::Orthodontist),
            Slot::open(dt("2024-08-05 12:00"), Doctor::JohnDoe, Specialization::OralSurgeon),
        ];
        for slot in &rows {
            queries::insert_slot(&conn, slot).unwrap();
        }
        conn
    }

    fn date(s: &str) -> AppointmentDate {
        AppointmentDate::parse(s).unwrap()
    }

    #[test]
    fn test_by_doctor_lists_open_times() {
        let conn = setup_db();
        let report = availability_by_doctor(&conn, &date("05-08-2024"), Doctor::JaneSmith).unwrap();
        assert_eq!(
            report.to_string(),
            "Doctor availability for 05-08-2024\nAvailable slots: 08:00, 13:30"
        );
    }

    #[test]
    fn test_by_doctor_empty_day_is_sentinel() {
        let conn = setup_db();
        for doctor in Doctor::ALL {
            let report = availability_by_doctor(&conn, &date("06-08-2024"), doctor).unwrap();
            assert_eq!(report, AvailabilityReport::NoAvailability);
            assert_eq!(report.to_string(), NO_AVAILABILITY);
        }
    }

    #[test]
    fn test_by_specialization_groups_by_doctor() {
        let conn = setup_db();
        let report = availability_by_specialization(
            &conn,
            &date("05-08-2024"),
            Specialization::Orthodontist,
        )
        .unwrap();

        assert_eq!(
            report.to_string(),
            "Doctor availability for 05-08-2024\n\
             emily johnson. Available slots:\n10:00 AM\n\
             jane smith. Available slots:\n8:00 AM, \n1:30 PM\n"
        );
    }

    #[test]
    fn test_by_specialization_empty() {
        let conn = setup_db();
        let report = availability_by_specialization(
            &conn,
            &date("05-08-2024"),
            Specialization::Prosthodontist,
        )
        .unwrap();
        assert_eq!(report.to_string(), NO_AVAILABILITY);
    }

    #[test]
    fn test_am_pm_edges() {
        let t = |s: &str| NaiveTime::parse_from_str(s, "%H:%M").unwrap();
        assert_eq!(to_am_pm(&t("00:05")), "12:05 AM");
        assert_eq!(to_am_pm(&t("12:00")), "12:00 PM");
        assert_eq!(to_am_pm(&t("17:45")), "5:45 PM");
    }
}
