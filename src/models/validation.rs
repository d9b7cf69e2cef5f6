use std::fmt;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

pub const DATE_FORMAT: &str = "%d-%m-%Y";
pub const DATETIME_FORMAT: &str = "%d-%m-%Y %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("ID number must be a 7 or 8-digit numeric value")]
    PatientId,

    #[error("Date must be in format 'DD-MM-YYYY'")]
    Date,

    #[error("Datetime must be in format 'DD-MM-YYYY HH:MM'")]
    DateTime,
}

fn patient_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{7,8}$").expect("valid patient id pattern"))
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("valid date pattern"))
}

fn datetime_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{2}-\d{2}-\d{4} \d{2}:\d{2}$").expect("valid datetime pattern")
    })
}

/// A 7 or 8 digit patient identification number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientId(i64);

impl PatientId {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if patient_id_regex().is_match(&value.to_string()) {
            Ok(Self(value))
        } else {
            Err(ValidationError::PatientId)
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A calendar date given as `DD-MM-YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentDate(NaiveDate);

impl AppointmentDate {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if !date_regex().is_match(s) {
            return Err(ValidationError::Date);
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::Date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for AppointmentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// A date and time of day given as `DD-MM-YYYY HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentDateTime(NaiveDateTime);

impl AppointmentDateTime {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if !datetime_regex().is_match(s) {
            return Err(ValidationError::DateTime);
        }
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::DateTime)
    }

    pub fn date_time(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for AppointmentDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATETIME_FORMAT))
    }
}
