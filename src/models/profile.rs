use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, clean_required, ValidationError};

/// Display identity layered on an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Reference to an avatar held in external file storage.
    pub avatar_ref: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    pub name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl UserProfile {
    pub fn new(user_id: Uuid, name: &str, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id,
            name: clean_required(name, "name")?,
            first_name: None,
            last_name: None,
            avatar_ref: None,
            birth_date: None,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, input: ProfileInput, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.name = clean_required(&input.name, "name")?;
        self.first_name = clean_optional(input.first_name);
        self.last_name = clean_optional(input.last_name);
        self.avatar_ref = clean_optional(input.avatar_ref);
        self.birth_date = input.birth_date;
        self.updated_at = now;
        Ok(())
    }
}
