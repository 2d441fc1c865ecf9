use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const MEDICATION_COLUMNS: &str = "id, user_id, name, dosage, notes, times_of_day, weekdays,
         doctor_id, prescriber_name, info_url, created_at, updated_at";

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, user_id, name, dosage, notes, times_of_day, weekdays,
         doctor_id, prescriber_name, info_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            med.id.to_string(),
            med.user_id.to_string(),
            med.name,
            med.dosage,
            med.notes,
            serde_json::to_string(&med.times_of_day)?,
            serde_json::to_string(&med.weekdays)?,
            med.doctor_id.map(|id| id.to_string()),
            med.prescriber_name,
            med.info_url,
            med.created_at.to_rfc3339(),
            med.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn update_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medications SET name = ?3, dosage = ?4, notes = ?5, times_of_day = ?6,
         weekdays = ?7, doctor_id = ?8, prescriber_name = ?9, info_url = ?10, updated_at = ?11
         WHERE id = ?1 AND user_id = ?2",
        params![
            med.id.to_string(),
            med.user_id.to_string(),
            med.name,
            med.dosage,
            med.notes,
            serde_json::to_string(&med.times_of_day)?,
            serde_json::to_string(&med.weekdays)?,
            med.doctor_id.map(|id| id.to_string()),
            med.prescriber_name,
            med.info_url,
            med.updated_at.to_rfc3339(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("medication", med.id));
    }
    Ok(())
}

pub fn get_medication(
    conn: &Connection,
    user_id: &Uuid,
    med_id: &Uuid,
) -> Result<Option<Medication>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1 AND user_id = ?2"),
            params![med_id.to_string(), user_id.to_string()],
            medication_row_from_rusqlite,
        )
        .optional()?;
    row.map(medication_from_row).transpose()
}

/// Every medication the user owns, by name.
pub fn list_medications_for_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications WHERE user_id = ?1
         ORDER BY name COLLATE NOCASE, created_at"
    ))?;

    let rows = stmt.query_map(params![user_id.to_string()], medication_row_from_rusqlite)?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row?)?);
    }
    Ok(meds)
}

/// Delete a medication and its doses in one transaction.
pub fn delete_medication_cascade(
    conn: &Connection,
    user_id: &Uuid,
    med_id: &Uuid,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM doses WHERE medication_id = ?1 AND user_id = ?2",
        params![med_id.to_string(), user_id.to_string()],
    )?;
    let deleted = tx.execute(
        "DELETE FROM medications WHERE id = ?1 AND user_id = ?2",
        params![med_id.to_string(), user_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("medication", med_id));
    }
    tx.commit()?;
    Ok(())
}

// Internal row type for Medication mapping
struct MedicationRow {
    id: String,
    user_id: String,
    name: String,
    dosage: String,
    notes: Option<String>,
    times_of_day: String,
    weekdays: String,
    doctor_id: Option<String>,
    prescriber_name: Option<String>,
    info_url: Option<String>,
    created_at: String,
    updated_at: String,
}

fn medication_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        notes: row.get(4)?,
        times_of_day: row.get(5)?,
        weekdays: row.get(6)?,
        doctor_id: row.get(7)?,
        prescriber_name: row.get(8)?,
        info_url: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: parse_uuid(&row.id)?,
        user_id: parse_uuid(&row.user_id)?,
        name: row.name,
        dosage: row.dosage,
        notes: row.notes,
        times_of_day: serde_json::from_str(&row.times_of_day)?,
        weekdays: serde_json::from_str(&row.weekdays)?,
        doctor_id: row.doctor_id.as_deref().map(parse_uuid).transpose()?,
        prescriber_name: row.prescriber_name,
        info_url: row.info_url,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
