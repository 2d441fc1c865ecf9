use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{like_pattern, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "id, user_id, first_name, last_name, specialty, registration_number,
         address, postal_code, city, phone, email, source, active, created_at, updated_at";

pub fn insert_doctor(conn: &Connection, doc: &Doctor) -> Result<(), DatabaseError> {
    let owner = doc
        .user_id
        .ok_or_else(|| DatabaseError::ConstraintViolation("doctor without owner".into()))?;
    conn.execute(
        "INSERT INTO doctors (id, user_id, first_name, last_name, specialty, registration_number,
         address, postal_code, city, phone, email, source, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            doc.id.to_string(),
            owner.to_string(),
            doc.first_name,
            doc.last_name,
            doc.specialty,
            doc.registration_number,
            doc.address,
            doc.postal_code,
            doc.city,
            doc.phone,
            doc.email,
            doc.source.to_string(),
            doc.active as i32,
            doc.created_at.to_rfc3339(),
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn update_doctor(conn: &Connection, user_id: &Uuid, doc: &Doctor) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET first_name = ?3, last_name = ?4, specialty = ?5,
         registration_number = ?6, address = ?7, postal_code = ?8, city = ?9, phone = ?10,
         email = ?11, active = ?12, updated_at = ?13
         WHERE id = ?1 AND user_id = ?2",
        params![
            doc.id.to_string(),
            user_id.to_string(),
            doc.first_name,
            doc.last_name,
            doc.specialty,
            doc.registration_number,
            doc.address,
            doc.postal_code,
            doc.city,
            doc.phone,
            doc.email,
            doc.active as i32,
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("doctor", doc.id));
    }
    Ok(())
}

/// Medications linked to the doctor keep existing with the link cleared.
pub fn delete_doctor(conn: &Connection, user_id: &Uuid, doctor_id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM doctors WHERE id = ?1 AND user_id = ?2",
        params![doctor_id.to_string(), user_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("doctor", doctor_id));
    }
    Ok(())
}

pub fn get_doctor(
    conn: &Connection,
    user_id: &Uuid,
    doctor_id: &Uuid,
) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1 AND user_id = ?2"),
            params![doctor_id.to_string(), user_id.to_string()],
            doctor_from_rusqlite,
        )
        .optional()?;
    row.map(doctor_from_row).transpose()
}

pub fn list_doctors(conn: &Connection, user_id: &Uuid) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1
         ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map(params![user_id.to_string()], doctor_from_rusqlite)?;
    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(doctor_from_row(row?)?);
    }
    Ok(doctors)
}

/// Substring match over name, specialty, city and registration number.
pub fn search_doctors(
    conn: &Connection,
    user_id: &Uuid,
    query: &str,
) -> Result<Vec<Doctor>, DatabaseError> {
    let pattern = like_pattern(query.trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         WHERE user_id = ?1 AND active = 1 AND (
            first_name LIKE ?2 ESCAPE '\\'
            OR last_name LIKE ?2 ESCAPE '\\'
            OR (first_name || ' ' || last_name) LIKE ?2 ESCAPE '\\'
            OR (last_name || ' ' || first_name) LIKE ?2 ESCAPE '\\'
            OR specialty LIKE ?2 ESCAPE '\\'
            OR city LIKE ?2 ESCAPE '\\'
            OR registration_number LIKE ?2 ESCAPE '\\'
         )
         ORDER BY last_name COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map(params![user_id.to_string(), pattern], doctor_from_rusqlite)?;
    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(doctor_from_row(row?)?);
    }
    Ok(doctors)
}

pub fn find_doctor_by_registration(
    conn: &Connection,
    user_id: &Uuid,
    registration_number: &str,
) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {DOCTOR_COLUMNS} FROM doctors
                 WHERE user_id = ?1 AND registration_number = ?2 LIMIT 1"
            ),
            params![user_id.to_string(), registration_number],
            doctor_from_rusqlite,
        )
        .optional()?;
    row.map(doctor_from_row).transpose()
}

struct DoctorRow {
    id: String,
    user_id: String,
    first_name: String,
    last_name: String,
    specialty: Option<String>,
    registration_number: Option<String>,
    address: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    source: String,
    active: i32,
    created_at: String,
    updated_at: String,
}

fn doctor_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<DoctorRow, rusqlite::Error> {
    Ok(DoctorRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        specialty: row.get(4)?,
        registration_number: row.get(5)?,
        address: row.get(6)?,
        postal_code: row.get(7)?,
        city: row.get(8)?,
        phone: row.get(9)?,
        email: row.get(10)?,
        source: row.get(11)?,
        active: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: parse_uuid(&row.id)?,
        user_id: Some(parse_uuid(&row.user_id)?),
        first_name: row.first_name,
        last_name: row.last_name,
        specialty: row.specialty,
        registration_number: row.registration_number,
        address: row.address,
        postal_code: row.postal_code,
        city: row.city,
        phone: row.phone,
        email: row.email,
        source: DoctorSource::from(row.source),
        active: row.active != 0,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
