//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` and scopes reads and
//! writes to the owning user. All public functions are re-exported here.

mod doctor;
mod dose;
mod medication;
mod user;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub use doctor::*;
pub use dose::*;
pub use medication::*;
pub use user::*;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(format!("bad uuid {raw}: {e}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw}: {e}")))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date {raw}: {e}")))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// SQL `LIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(crate) fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
