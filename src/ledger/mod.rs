//! Dose ledger: materializes a day's doses from the weekly schedules and
//! tracks which ones were taken.
//!
//! - `materializer`: fills the gaps for one date, idempotently
//! - `transitions`: `DayLedger`, the per-day view-model with toggles
//! - `reminders`: in-session timers for untaken time-of-day groups

pub mod materializer;
pub mod reminders;
pub mod transitions;

pub use materializer::*;
pub use reminders::*;
pub use transitions::*;

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Dose {0} is not part of this day")]
    UnknownDose(Uuid),

    #[error("Invalid reminder settings: {0}")]
    InvalidReminder(String),

    #[error("Invalid date range: {from} to {to}")]
    InvalidRange {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use crate::db;
    use crate::models::{Medication, MedicationInput, Weekday};
    use crate::store::SqliteStore;

    /// 2024-01-15, a Monday.
    pub fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    pub fn store_with_user() -> (SqliteStore, Uuid) {
        let store = SqliteStore::in_memory().unwrap();
        let user = Uuid::new_v4();
        store
            .with_conn(|conn| db::insert_user(conn, &user, "ledger@example.org", "h", "s", Utc::now()))
            .unwrap();
        (store, user)
    }

    pub fn add_medication(
        store: &SqliteStore,
        user: Uuid,
        name: &str,
        times: &[&str],
        days: &[Weekday],
    ) -> Medication {
        let med = Medication::new(
            user,
            MedicationInput {
                name: name.into(),
                dosage: "1 tablet".into(),
                times_of_day: times.iter().map(|t| t.to_string()).collect(),
                weekdays: days.to_vec(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        store.with_conn(|conn| db::insert_medication(conn, &med)).unwrap();
        med
    }
}
