use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Storage format of `date_slot` inside the database. Zero padded so that
/// lexical order matches chronological order.
pub const STORE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Doctor {
    KevinAnderson,
    RobertMartinez,
    SusanDavis,
    DanielMiller,
    SarahWilson,
    MichaelGreen,
    LisaBrown,
    JaneSmith,
    EmilyJohnson,
    JohnDoe,
}

impl Doctor {
    pub const ALL: [Doctor; 10] = [
        Doctor::KevinAnderson,
        Doctor::RobertMartinez,
        Doctor::SusanDavis,
        Doctor::DanielMiller,
        Doctor::SarahWilson,
        Doctor::MichaelGreen,
        Doctor::LisaBrown,
        Doctor::JaneSmith,
        Doctor::EmilyJohnson,
        Doctor::JohnDoe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Doctor::KevinAnderson => "kevin anderson",
            Doctor::RobertMartinez => "robert martinez",
            Doctor::SusanDavis => "susan davis",
            Doctor::DanielMiller => "daniel miller",
            Doctor::SarahWilson => "sarah wilson",
            Doctor::MichaelGreen => "michael green",
            Doctor::LisaBrown => "lisa brown",
            Doctor::JaneSmith => "jane smith",
            Doctor::EmilyJohnson => "emily johnson",
            Doctor::JohnDoe => "john doe",
        }
    }

    /// Accepts the stored lower-case name, any casing of it, and an optional
    /// "Dr." prefix as the model tends to write it.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        let name = lowered
            .strip_prefix("dr.")
            .or_else(|| lowered.strip_prefix("dr "))
            .unwrap_or(&lowered);
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    GeneralDentist,
    CosmeticDentist,
    Prosthodontist,
    PediatricDentist,
    EmergencyDentist,
    OralSurgeon,
    Orthodontist,
}

impl Specialization {
    pub const ALL: [Specialization; 7] = [
        Specialization::GeneralDentist,
        Specialization::CosmeticDentist,
        Specialization::Prosthodontist,
        Specialization::PediatricDentist,
        Specialization::EmergencyDentist,
        Specialization::OralSurgeon,
        Specialization::Orthodontist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Specialization::GeneralDentist => "general_dentist",
            Specialization::CosmeticDentist => "cosmetic_dentist",
            Specialization::Prosthodontist => "prosthodontist",
            Specialization::PediatricDentist => "pediatric_dentist",
            Specialization::EmergencyDentist => "emergency_dentist",
            Specialization::OralSurgeon => "oral_surgeon",
            Specialization::Orthodontist => "orthodontist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|sp| sp.as_str() == normalized)
    }
}

/// One bookable row of the availability store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub date_time: NaiveDateTime,
    pub doctor: Doctor,
    pub specialization: Specialization,
    pub is_available: bool,
    pub patient_to_attend: Option<i64>,
}

impl Slot {
    pub fn open(date_time: NaiveDateTime, doctor: Doctor, specialization: Specialization) -> Self {
        Self {
            date_time,
            doctor,
            specialization,
            is_available: true,
            patient_to_attend: None,
        }
    }

    pub fn booked(
        date_time: NaiveDateTime,
        doctor: Doctor,
        specialization: Specialization,
        patient_id: i64,
    ) -> Self {
        Self {
            date_time,
            doctor,
            specialization,
            is_available: false,
            patient_to_attend: Some(patient_id),
        }
    }
}
