use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use super::{format_date, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const DOSE_COLUMNS: &str = "id, medication_id, user_id, scheduled_date, time_of_day, taken,
         taken_at, created_at, updated_at";

/// Insert doses in one transaction, skipping any that already exist for the
/// same (medication, time of day, date). Returns the rows actually written.
pub fn insert_doses(conn: &Connection, doses: &[Dose]) -> Result<Vec<Dose>, DatabaseError> {
    if doses.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.unchecked_transaction()?;
    let mut inserted = Vec::with_capacity(doses.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO doses (id, medication_id, user_id, scheduled_date, time_of_day,
             taken, taken_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(medication_id, time_of_day, scheduled_date) DO NOTHING",
        )?;
        for dose in doses {
            let changed = stmt.execute(params![
                dose.id.to_string(),
                dose.medication_id.to_string(),
                dose.user_id.to_string(),
                format_date(dose.scheduled_date),
                dose.time_of_day.as_str(),
                dose.taken as i32,
                dose.taken_at.map(|ts| ts.to_rfc3339()),
                dose.created_at.to_rfc3339(),
                dose.updated_at.to_rfc3339(),
            ])?;
            if changed > 0 {
                inserted.push(dose.clone());
            }
        }
    }
    tx.commit()?;
    Ok(inserted)
}

pub fn list_doses_for_date(
    conn: &Connection,
    user_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<Dose>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSE_COLUMNS} FROM doses WHERE user_id = ?1 AND scheduled_date = ?2
         ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(
        params![user_id.to_string(), format_date(date)],
        dose_row_from_rusqlite,
    )?;

    let mut doses = Vec::new();
    for row in rows {
        doses.push(dose_from_row(row?)?);
    }
    Ok(doses)
}

pub fn get_dose(
    conn: &Connection,
    user_id: &Uuid,
    dose_id: &Uuid,
) -> Result<Option<Dose>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOSE_COLUMNS} FROM doses WHERE id = ?1 AND user_id = ?2"),
            params![dose_id.to_string(), user_id.to_string()],
            dose_row_from_rusqlite,
        )
        .optional()?;
    row.map(dose_from_row).transpose()
}

/// Set the taken state for a batch of the user's doses, all or nothing.
/// Returns how many rows changed.
pub fn update_dose_state(
    conn: &Connection,
    user_id: &Uuid,
    dose_ids: &[Uuid],
    taken: bool,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    if dose_ids.is_empty() {
        return Ok(0);
    }

    let taken_at = taken_stamp(taken, now).map(|ts| ts.to_rfc3339());
    let tx = conn.unchecked_transaction()?;
    let mut changed = 0;
    {
        let mut stmt = tx.prepare(
            "UPDATE doses SET taken = ?1, taken_at = ?2, updated_at = ?3
             WHERE id = ?4 AND user_id = ?5",
        )?;
        for id in dose_ids {
            changed += stmt.execute(params![
                taken as i32,
                taken_at,
                now.to_rfc3339(),
                id.to_string(),
                user_id.to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(changed)
}

/// Taken/total counts for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: u32,
    pub taken: u32,
}

/// Per-day counts over already materialized doses in `[from, to]`.
pub fn summarize_doses(
    conn: &Connection,
    user_id: &Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DaySummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT scheduled_date, COUNT(*), SUM(taken) FROM doses
         WHERE user_id = ?1 AND scheduled_date BETWEEN ?2 AND ?3
         GROUP BY scheduled_date ORDER BY scheduled_date",
    )?;
    let rows = stmt.query_map(
        params![user_id.to_string(), format_date(from), format_date(to)],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, Option<u32>>(2)?,
            ))
        },
    )?;

    let mut days = Vec::new();
    for row in rows {
        let (date, total, taken) = row?;
        days.push(DaySummary {
            date: parse_date(&date)?,
            total,
            taken: taken.unwrap_or(0),
        });
    }
    Ok(days)
}

struct DoseRow {
    id: String,
    medication_id: String,
    user_id: String,
    scheduled_date: String,
    time_of_day: String,
    taken: i32,
    taken_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn dose_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<DoseRow, rusqlite::Error> {
    Ok(DoseRow {
        id: row.get(0)?,
        medication_id: row.get(1)?,
        user_id: row.get(2)?,
        scheduled_date: row.get(3)?,
        time_of_day: row.get(4)?,
        taken: row.get(5)?,
        taken_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn dose_from_row(row: DoseRow) -> Result<Dose, DatabaseError> {
    Ok(Dose {
        id: parse_uuid(&row.id)?,
        medication_id: parse_uuid(&row.medication_id)?,
        user_id: parse_uuid(&row.user_id)?,
        scheduled_date: parse_date(&row.scheduled_date)?,
        time_of_day: TimeOfDay::from(row.time_of_day),
        taken: row.taken != 0,
        taken_at: row.taken_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
