//! Medication schedules: validated create/update/delete over the
//! repository layer.
//!
//! A linked doctor must be one of the user's own directory entries. When
//! no prescriber name is given, the linked doctor's name is used.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{Medication, MedicationInput, ValidationError};

#[derive(Error, Debug)]
pub enum MedicationError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid medication: {0}")]
    Validation(#[from] ValidationError),

    #[error("Medication not found: {0}")]
    NotFound(Uuid),

    #[error("Doctor {0} is not in your directory")]
    UnknownDoctor(Uuid),
}

pub fn list_medications(conn: &Connection, user_id: &Uuid) -> Result<Vec<Medication>, MedicationError> {
    Ok(db::list_medications_for_user(conn, user_id)?)
}

pub fn get_medication(conn: &Connection, user_id: &Uuid, med_id: &Uuid) -> Result<Medication, MedicationError> {
    db::get_medication(conn, user_id, med_id)?.ok_or(MedicationError::NotFound(*med_id))
}

pub fn create_medication(
    conn: &Connection,
    user_id: &Uuid,
    input: MedicationInput,
    now: DateTime<Utc>,
) -> Result<Medication, MedicationError> {
    let mut med = Medication::new(*user_id, input, now)?;
    link_prescriber(conn, &mut med)?;
    db::insert_medication(conn, &med)?;
    tracing::info!(user = %user_id, medication = %med.id, "Medication created");
    Ok(med)
}

/// Replace a medication's fields. Doses already materialized are kept;
/// newly scheduled slots are filled in the next time a day is viewed.
pub fn update_medication(
    conn: &Connection,
    user_id: &Uuid,
    med_id: &Uuid,
    input: MedicationInput,
    now: DateTime<Utc>,
) -> Result<Medication, MedicationError> {
    let mut med = get_medication(conn, user_id, med_id)?;
    med.apply(input, now)?;
    link_prescriber(conn, &mut med)?;
    db::update_medication(conn, &med)?;
    Ok(med)
}

/// Remove a medication together with all of its doses.
pub fn delete_medication(conn: &Connection, user_id: &Uuid, med_id: &Uuid) -> Result<(), MedicationError> {
    match db::delete_medication_cascade(conn, user_id, med_id) {
        Err(DatabaseError::NotFound { .. }) => Err(MedicationError::NotFound(*med_id)),
        other => Ok(other?),
    }?;
    tracing::info!(user = %user_id, medication = %med_id, "Medication deleted");
    Ok(())
}

fn link_prescriber(conn: &Connection, med: &mut Medication) -> Result<(), MedicationError> {
    let Some(doctor_id) = med.doctor_id else {
        return Ok(());
    };
    let doctor = db::get_doctor(conn, &med.user_id, &doctor_id)?.ok_or(MedicationError::UnknownDoctor(doctor_id))?;
    if med.prescriber_name.is_none() {
        med.prescriber_name = Some(doctor.full_name());
    }
    Ok(())
}
