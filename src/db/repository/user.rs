use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_date, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::UserProfile;

/// Stored login material for one account.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
}

pub fn insert_user(
    conn: &Connection,
    id: &Uuid,
    email: &str,
    password_hash: &str,
    password_salt: &str,
    created_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, password_hash, password_salt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id.to_string(),
            email,
            password_hash,
            password_salt,
            created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_credentials_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<UserCredentials>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, email, password_hash, password_salt FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, email, password_hash, password_salt)| {
        Ok(UserCredentials {
            user_id: parse_uuid(&id)?,
            email,
            password_hash,
            password_salt,
        })
    })
    .transpose()
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![email],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

pub fn upsert_profile(conn: &Connection, profile: &UserProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO profiles (user_id, name, first_name, last_name, avatar_ref, birth_date, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id) DO UPDATE SET
            name = excluded.name,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            avatar_ref = excluded.avatar_ref,
            birth_date = excluded.birth_date,
            updated_at = excluded.updated_at",
        params![
            profile.user_id.to_string(),
            profile.name,
            profile.first_name,
            profile.last_name,
            profile.avatar_ref,
            profile.birth_date.map(format_date),
            profile.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, user_id: &Uuid) -> Result<Option<UserProfile>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT user_id, name, first_name, last_name, avatar_ref, birth_date, updated_at
             FROM profiles WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((id, name, first_name, last_name, avatar_ref, birth_date, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(UserProfile {
        user_id: parse_uuid(&id)?,
        name,
        first_name,
        last_name,
        avatar_ref,
        birth_date: birth_date.as_deref().map(parse_date).transpose()?,
        updated_at: parse_timestamp(&updated_at)?,
    }))
}
