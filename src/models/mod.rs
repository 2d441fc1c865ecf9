//! Domain records: medications and their schedules, materialized doses,
//! the doctor directory and the user profile.

pub mod doctor;
pub mod dose;
pub mod enums;
pub mod medication;
pub mod profile;
pub mod time_of_day;

pub use doctor::*;
pub use enums::*;
pub use dose::*;
pub use medication::*;
pub use profile::*;
pub use time_of_day::*;

use thiserror::Error;

/// Input rejected before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("At least one time of day is required")]
    NoTimesOfDay,

    #[error("At least one weekday is required")]
    NoWeekdays,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Entry is read-only: {0}")]
    ReadOnly(String),
}

/// Trim an optional free-text field, mapping blank to `None`.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim a required free-text field, rejecting blank input.
pub(crate) fn clean_required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_optional_drops_blank() {
        assert_eq!(clean_optional(Some("   ".into())), None);
        assert_eq!(clean_optional(None), None);
        assert_eq!(clean_optional(Some(" Dr ".into())), Some("Dr".into()));
    }

    #[test]
    fn clean_required_rejects_blank() {
        assert_eq!(
            clean_required("  ", "name"),
            Err(ValidationError::MissingField("name"))
        );
        assert_eq!(clean_required(" Doliprane ", "name").unwrap(), "Doliprane");
    }
}
