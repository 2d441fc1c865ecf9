use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::medication::Medication;
use super::time_of_day::TimeOfDay;

/// One medication due at one time of day on one date.
///
/// `taken_at` is `Some` exactly when `taken` is true; only `mark` changes either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dose {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub time_of_day: TimeOfDay,
    pub taken: bool,
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dose {
    /// A fresh, untaken dose for `medication` at `slot` on `date`.
    pub fn pending(
        medication: &Medication,
        slot: TimeOfDay,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            medication_id: medication.id,
            user_id: medication.user_id,
            scheduled_date: date,
            time_of_day: slot,
            taken: false,
            taken_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the taken state, stamping or clearing `taken_at` to match.
    pub fn mark(&mut self, taken: bool, now: DateTime<Utc>) {
        self.taken = taken;
        self.taken_at = taken_stamp(taken, now);
        self.updated_at = now;
    }

    /// Whether this dose is the `(medication, slot)` pair of a schedule entry.
    pub fn matches(&self, medication_id: &Uuid, slot: &TimeOfDay) -> bool {
        &self.medication_id == medication_id && &self.time_of_day == slot
    }
}

/// The `taken_at` value that goes with a taken flag.
pub fn taken_stamp(taken: bool, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    taken.then_some(now)
}

/// A dose joined with its medication's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseView {
    #[serde(flatten)]
    pub dose: Dose,
    pub medication_name: String,
    pub dosage: String,
    pub notes: Option<String>,
}

impl DoseView {
    pub fn new(dose: Dose, medication: &Medication) -> Self {
        Self {
            dose,
            medication_name: medication.name.clone(),
            dosage: medication.dosage.clone(),
            notes: medication.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicationInput, Weekday};

    fn medication() -> Medication {
        Medication::new(
            Uuid::new_v4(),
            MedicationInput {
                name: "Levothyrox".into(),
                dosage: "75 µg".into(),
                notes: Some("Fasting".into()),
                times_of_day: vec!["morning".into()],
                weekdays: Weekday::ALL.to_vec(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn pending_dose_is_untaken() {
        let med = medication();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let dose = Dose::pending(&med, TimeOfDay::Morning, date, Utc::now());
        assert!(!dose.taken);
        assert!(dose.taken_at.is_none());
        assert_eq!(dose.user_id, med.user_id);
        assert!(dose.matches(&med.id, &TimeOfDay::Morning));
        assert!(!dose.matches(&med.id, &TimeOfDay::Night));
    }

    #[test]
    fn mark_keeps_flag_and_stamp_consistent() {
        let med = medication();
        let mut dose = Dose::pending(&med, TimeOfDay::Morning, Utc::now().date_naive(), Utc::now());

        let now = Utc::now();
        dose.mark(true, now);
        assert!(dose.taken);
        assert_eq!(dose.taken_at, Some(now));

        dose.mark(false, Utc::now());
        assert!(!dose.taken);
        assert!(dose.taken_at.is_none());
    }

    #[test]
    fn view_flattens_dose_fields() {
        let med = medication();
        let dose = Dose::pending(&med, TimeOfDay::Morning, Utc::now().date_naive(), Utc::now());
        let view = DoseView::new(dose, &med);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["medication_name"], "Levothyrox");
        assert_eq!(json["time_of_day"], "morning");
        assert_eq!(json["taken"], false);
        assert!(json["taken_at"].is_null());
    }
}
