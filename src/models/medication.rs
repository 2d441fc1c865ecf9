use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Weekday;
use super::time_of_day::{normalize_times, TimeOfDay};
use super::{clean_optional, clean_required, ValidationError};

/// A user-owned prescription with its weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub notes: Option<String>,
    pub times_of_day: Vec<TimeOfDay>,
    pub weekdays: Vec<Weekday>,
    pub doctor_id: Option<Uuid>,
    pub prescriber_name: Option<String>,
    pub info_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form payload for creating or editing a medication.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationInput {
    pub name: String,
    pub dosage: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub times_of_day: Vec<String>,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub prescriber_name: Option<String>,
    #[serde(default)]
    pub info_url: Option<String>,
}

/// Validated, normalized fields shared by create and update.
struct MedicationFields {
    name: String,
    dosage: String,
    notes: Option<String>,
    times_of_day: Vec<TimeOfDay>,
    weekdays: Vec<Weekday>,
    doctor_id: Option<Uuid>,
    prescriber_name: Option<String>,
    info_url: Option<String>,
}

impl MedicationInput {
    fn validate(self) -> Result<MedicationFields, ValidationError> {
        let name = clean_required(&self.name, "name")?;
        let dosage = clean_required(&self.dosage, "dosage")?;

        let times_of_day = normalize_times(&self.times_of_day);
        if times_of_day.is_empty() {
            return Err(ValidationError::NoTimesOfDay);
        }

        let mut weekdays = self.weekdays;
        weekdays.sort();
        weekdays.dedup();
        if weekdays.is_empty() {
            return Err(ValidationError::NoWeekdays);
        }

        let info_url = clean_optional(self.info_url);
        if let Some(url) = &info_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::InvalidUrl(url.clone()));
            }
        }

        Ok(MedicationFields {
            name,
            dosage,
            notes: clean_optional(self.notes),
            times_of_day,
            weekdays,
            doctor_id: self.doctor_id,
            prescriber_name: clean_optional(self.prescriber_name),
            info_url,
        })
    }
}

impl Medication {
    /// Build a new medication from form input. Fails before anything is stored.
    pub fn new(
        user_id: Uuid,
        input: MedicationInput,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let fields = input.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            name: fields.name,
            dosage: fields.dosage,
            notes: fields.notes,
            times_of_day: fields.times_of_day,
            weekdays: fields.weekdays,
            doctor_id: fields.doctor_id,
            prescriber_name: fields.prescriber_name,
            info_url: fields.info_url,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the editable fields with validated input.
    pub fn apply(&mut self, input: MedicationInput, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let fields = input.validate()?;
        self.name = fields.name;
        self.dosage = fields.dosage;
        self.notes = fields.notes;
        self.times_of_day = fields.times_of_day;
        self.weekdays = fields.weekdays;
        self.doctor_id = fields.doctor_id;
        self.prescriber_name = fields.prescriber_name;
        self.info_url = fields.info_url;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_active_on(&self, day: Weekday) -> bool {
        self.weekdays.contains(&day)
    }
}
