//! Data-access boundary for the dose ledger and the doctor directory.
//!
//! The ledger and aggregator only see these traits. `SqliteStore` is the
//! implementation built once at startup and shared through `CoreState`;
//! tests swap in their own implementations where a failure must be forced.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError, DaySummary};
use crate::models::{Doctor, Dose, Medication};

/// Medications and the doses materialized from them.
pub trait DoseStore: Send + Sync {
    fn list_medications_for_user(&self, user_id: &Uuid) -> Result<Vec<Medication>, DatabaseError>;

    fn list_doses_for_date(&self, user_id: &Uuid, date: NaiveDate) -> Result<Vec<Dose>, DatabaseError>;

    /// Persist doses, skipping any slot that already exists. Returns the rows
    /// actually written.
    fn insert_doses(&self, doses: &[Dose]) -> Result<Vec<Dose>, DatabaseError>;

    /// Set one state on every listed dose. Returns the number of rows changed.
    fn update_dose_state(
        &self,
        user_id: &Uuid,
        dose_ids: &[Uuid],
        taken: bool,
        now: DateTime<Utc>,
    ) -> Result<usize, DatabaseError>;

    fn summarize_doses(
        &self,
        user_id: &Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySummary>, DatabaseError>;
}

/// The user's own doctor directory.
pub trait DoctorDirectory: Send + Sync {
    fn search_doctors_local(&self, user_id: &Uuid, query: &str) -> Result<Vec<Doctor>, DatabaseError>;
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("External directory unavailable: {0}")]
    Unavailable(String),

    #[error("External directory returned malformed data: {0}")]
    Malformed(String),
}

/// Best-effort supplementary doctor lookup.
pub trait ExternalDoctorSource: Send + Sync {
    /// Short name stamped into `DoctorSource::External`.
    fn name(&self) -> &str;

    fn search(&self, query: &str) -> Result<Vec<Doctor>, DirectoryError>;
}

// ═══════════════════════════════════════════════════════════
// SqliteStore
// ═══════════════════════════════════════════════════════════

/// Shared SQLite connection behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &std::path::Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }
}

impl DoseStore for SqliteStore {
    fn list_medications_for_user(&self, user_id: &Uuid) -> Result<Vec<Medication>, DatabaseError> {
        self.with_conn(|conn| db::list_medications_for_user(conn, user_id))
    }

    fn list_doses_for_date(&self, user_id: &Uuid, date: NaiveDate) -> Result<Vec<Dose>, DatabaseError> {
        self.with_conn(|conn| db::list_doses_for_date(conn, user_id, date))
    }

    fn insert_doses(&self, doses: &[Dose]) -> Result<Vec<Dose>, DatabaseError> {
        self.with_conn(|conn| db::insert_doses(conn, doses))
    }

    fn update_dose_state(
        &self,
        user_id: &Uuid,
        dose_ids: &[Uuid],
        taken: bool,
        now: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        self.with_conn(|conn| db::update_dose_state(conn, user_id, dose_ids, taken, now))
    }

    fn summarize_doses(
        &self,
        user_id: &Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySummary>, DatabaseError> {
        self.with_conn(|conn| db::summarize_doses(conn, user_id, from, to))
    }
}

impl DoctorDirectory for SqliteStore {
    fn search_doctors_local(&self, user_id: &Uuid, query: &str) -> Result<Vec<Doctor>, DatabaseError> {
        self.with_conn(|conn| db::search_doctors(conn, user_id, query))
    }
}
