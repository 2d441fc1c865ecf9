//! User accounts: registration, password verification and the profile
//! layered on top of the account.

use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use regex::Regex;
use rusqlite::Connection;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError, UserCredentials};
use crate::models::{ProfileInput, UserProfile, ValidationError};

pub const MIN_PASSWORD_LENGTH: usize = 8;

const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
const HASH_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("An account already exists for this email")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Profile not found for user {0}")]
    ProfileMissing(Uuid),
}

/// Trimmed, lowercased email, if it looks like one.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if EMAIL_PATTERN.is_match(&email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail(raw.trim().to_string()))
    }
}

fn hash_password(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}

/// Salt hashed against when the email is unknown, so both failures cost one
/// full derivation.
const UNKNOWN_USER_SALT: [u8; SALT_LENGTH] = *b"dosewise-nouser!";

/// A validated registration with its password already hashed.
///
/// Built by [`prepare_registration`] without touching the database, then
/// written by [`store_registration`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    email: String,
    password_hash: String,
    password_salt: String,
    profile: UserProfile,
}

/// Validate the request and derive the password hash. CPU-bound.
pub fn prepare_registration(
    email: &str,
    password: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<NewAccount, AccountError> {
    let email = normalize_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword(MIN_PASSWORD_LENGTH).into());
    }
    let profile = UserProfile::new(Uuid::new_v4(), name, now)?;

    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = hash_password(password, &salt);

    Ok(NewAccount {
        email,
        password_hash: STANDARD.encode(hash),
        password_salt: STANDARD.encode(salt),
        profile,
    })
}

/// Write the account and its profile in one transaction.
pub fn store_registration(conn: &Connection, account: NewAccount) -> Result<UserProfile, AccountError> {
    let NewAccount {
        email,
        password_hash,
        password_salt,
        profile,
    } = account;
    if db::email_exists(conn, &email)? {
        return Err(AccountError::EmailTaken);
    }

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    match db::insert_user(&tx, &profile.user_id, &email, &password_hash, &password_salt, profile.updated_at) {
        Err(e) if e.is_constraint() => return Err(AccountError::EmailTaken),
        other => other?,
    }
    db::upsert_profile(&tx, &profile)?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(user = %profile.user_id, "Account registered");
    Ok(profile)
}

/// Create an account and its profile.
pub fn register(
    conn: &Connection,
    email: &str,
    password: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<UserProfile, AccountError> {
    store_registration(conn, prepare_registration(email, password, name, now)?)
}

/// Stored credentials for `email`, if any.
pub fn lookup_credentials(conn: &Connection, email: &str) -> Result<Option<UserCredentials>, AccountError> {
    Ok(db::get_credentials_by_email(conn, &email.trim().to_lowercase())?)
}

/// Check a password against looked-up credentials. CPU-bound.
///
/// Unknown emails and wrong passwords fail the same way, after the same work.
pub fn verify_password(creds: Option<&UserCredentials>, password: &str) -> Result<Uuid, AccountError> {
    let Some(creds) = creds else {
        std::hint::black_box(hash_password(password, &UNKNOWN_USER_SALT));
        return Err(AccountError::InvalidCredentials);
    };

    let (Ok(salt), Ok(stored)) = (STANDARD.decode(&creds.password_salt), STANDARD.decode(&creds.password_hash)) else {
        tracing::error!(user = %creds.user_id, "Stored credentials are not valid base64");
        return Err(AccountError::InvalidCredentials);
    };

    let computed = hash_password(password, &salt);
    if computed.as_slice().ct_eq(stored.as_slice()).unwrap_u8() == 1 {
        Ok(creds.user_id)
    } else {
        Err(AccountError::InvalidCredentials)
    }
}

/// Check a password.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<Uuid, AccountError> {
    verify_password(lookup_credentials(conn, email)?.as_ref(), password)
}

pub fn get_profile(conn: &Connection, user_id: &Uuid) -> Result<UserProfile, AccountError> {
    db::get_profile(conn, user_id)?.ok_or(AccountError::ProfileMissing(*user_id))
}

pub fn update_profile(
    conn: &Connection,
    user_id: &Uuid,
    input: ProfileInput,
    now: DateTime<Utc>,
) -> Result<UserProfile, AccountError> {
    let mut profile = get_profile(conn, user_id)?;
    profile.apply(input, now)?;
    db::upsert_profile(conn, &profile)?;
    Ok(profile)
}
