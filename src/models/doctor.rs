use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, clean_required, ValidationError};

/// Where a directory entry comes from.
///
/// Wire form: `"local"` or `"external:<source name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DoctorSource {
    Local,
    External(String),
}

impl DoctorSource {
    pub fn is_local(&self) -> bool {
        matches!(self, DoctorSource::Local)
    }
}

impl From<String> for DoctorSource {
    fn from(raw: String) -> Self {
        match raw.strip_prefix("external:") {
            Some(name) => DoctorSource::External(name.to_string()),
            None => DoctorSource::Local,
        }
    }
}

impl From<DoctorSource> for String {
    fn from(source: DoctorSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DoctorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorSource::Local => f.write_str("local"),
            DoctorSource::External(name) => write!(f, "external:{name}"),
        }
    }
}

/// A directory entry. Only local entries are stored and editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    /// Owner of a local entry; `None` for external results.
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: DoctorSource,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Doctor {
    pub fn new_local(
        user_id: Uuid,
        input: DoctorInput,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let mut doctor = Self {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            first_name: String::new(),
            last_name: String::new(),
            specialty: None,
            registration_number: None,
            address: None,
            postal_code: None,
            city: None,
            phone: None,
            email: None,
            source: DoctorSource::Local,
            active: true,
            created_at: now,
            updated_at: now,
        };
        doctor.apply(input, now)?;
        Ok(doctor)
    }

    /// Overwrite editable fields. External entries are read-only.
    pub fn apply(&mut self, input: DoctorInput, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.ensure_editable()?;
        let first_name = clean_required(&input.first_name, "first_name")?;
        let last_name = clean_required(&input.last_name, "last_name")?;
        self.first_name = first_name;
        self.last_name = last_name;
        self.specialty = clean_optional(input.specialty);
        self.registration_number = clean_optional(input.registration_number);
        self.address = clean_optional(input.address);
        self.postal_code = clean_optional(input.postal_code);
        self.city = clean_optional(input.city);
        self.phone = clean_optional(input.phone);
        self.email = clean_optional(input.email);
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_editable(&self) -> Result<(), ValidationError> {
        if self.source.is_local() {
            Ok(())
        } else {
            Err(ValidationError::ReadOnly(format!(
                "{} comes from {} and must be imported first",
                self.full_name(),
                self.source
            )))
        }
    }

    /// Copy of an external entry as a new local doctor owned by `user_id`.
    pub fn imported_by(&self, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            source: DoctorSource::Local,
            active: true,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
