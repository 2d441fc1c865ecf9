//! Doctor directory: the user's own doctors plus a supplementary external
//! source that can be searched alongside them and imported from.

pub mod aggregator;
pub mod registry;

pub use aggregator::*;
pub use registry::*;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{clean_required, Doctor, DoctorInput, ValidationError};

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid doctor: {0}")]
    Validation(#[from] ValidationError),

    #[error("Doctor not found: {0}")]
    NotFound(Uuid),

    #[error("Doctor {0} is already in the local directory")]
    AlreadyLocal(Uuid),
}

pub fn list_doctors(conn: &Connection, user_id: &Uuid) -> Result<Vec<Doctor>, DoctorError> {
    Ok(db::list_doctors(conn, user_id)?)
}

pub fn create_doctor(
    conn: &Connection,
    user_id: &Uuid,
    input: DoctorInput,
    now: DateTime<Utc>,
) -> Result<Doctor, DoctorError> {
    let doctor = Doctor::new_local(*user_id, input, now)?;
    db::insert_doctor(conn, &doctor)?;
    tracing::info!(user = %user_id, doctor = %doctor.id, "Doctor created");
    Ok(doctor)
}

pub fn update_doctor(
    conn: &Connection,
    user_id: &Uuid,
    doctor_id: &Uuid,
    input: DoctorInput,
    now: DateTime<Utc>,
) -> Result<Doctor, DoctorError> {
    let mut doctor = db::get_doctor(conn, user_id, doctor_id)?.ok_or(DoctorError::NotFound(*doctor_id))?;
    doctor.apply(input, now)?;
    db::update_doctor(conn, user_id, &doctor)?;
    Ok(doctor)
}

/// Set whether a doctor shows up in searches, without touching other fields.
pub fn set_doctor_active(
    conn: &Connection,
    user_id: &Uuid,
    doctor_id: &Uuid,
    active: bool,
    now: DateTime<Utc>,
) -> Result<Doctor, DoctorError> {
    let mut doctor = db::get_doctor(conn, user_id, doctor_id)?.ok_or(DoctorError::NotFound(*doctor_id))?;
    doctor.active = active;
    doctor.updated_at = now;
    db::update_doctor(conn, user_id, &doctor)?;
    Ok(doctor)
}

pub fn delete_doctor(conn: &Connection, user_id: &Uuid, doctor_id: &Uuid) -> Result<(), DoctorError> {
    match db::delete_doctor(conn, user_id, doctor_id) {
        Err(DatabaseError::NotFound { .. }) => Err(DoctorError::NotFound(*doctor_id)),
        other => Ok(other?),
    }
}

/// Copy an external search result into the user's directory.
///
/// When a local doctor already carries the same registration number, that
/// doctor is returned and nothing is written.
pub fn import_external(
    conn: &Connection,
    user_id: &Uuid,
    candidate: &Doctor,
    now: DateTime<Utc>,
) -> Result<Doctor, DoctorError> {
    if candidate.source.is_local() {
        return Err(DoctorError::AlreadyLocal(candidate.id));
    }
    clean_required(&candidate.first_name, "first_name")?;
    clean_required(&candidate.last_name, "last_name")?;

    if let Some(reg) = candidate.registration_number.as_deref() {
        if let Some(existing) = db::find_doctor_by_registration(conn, user_id, reg)? {
            tracing::debug!(user = %user_id, doctor = %existing.id, "Import matched existing doctor");
            return Ok(existing);
        }
    }

    let doctor = candidate.imported_by(*user_id, now);
    db::insert_doctor(conn, &doctor)?;
    tracing::info!(user = %user_id, doctor = %doctor.id, source = %candidate.source, "Doctor imported");
    Ok(doctor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::models::DoctorSource;

    fn input(first: &str, last: &str) -> DoctorInput {
        DoctorInput {
            first_name: first.into(),
            last_name: last.into(),
            registration_number: Some("10003456789".into()),
            ..Default::default()
        }
    }

    fn external(first: &str, last: &str, reg: Option<&str>) -> Doctor {
        let mut doc = Doctor::new_local(Uuid::new_v4(), input(first, last), Utc::now()).unwrap();
        doc.user_id = None;
        doc.registration_number = reg.map(String::from);
        doc.source = DoctorSource::External("registry".into());
        doc
    }

    #[test]
    fn crud_round_trip() {
        let conn = test_db();
        let user = make_user(&conn, "doc@example.org");
        let doc = create_doctor(&conn, &user, input("Claire", "Martin"), Utc::now()).unwrap();

        let updated = update_doctor(
            &conn,
            &user,
            &doc.id,
            DoctorInput {
                city: Some("Lyon".into()),
                ..input("Claire", "Martin-Durand")
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.last_name, "Martin-Durand");
        assert_eq!(list_doctors(&conn, &user).unwrap(), vec![updated]);

        delete_doctor(&conn, &user, &doc.id).unwrap();
        assert!(matches!(
            delete_doctor(&conn, &user, &doc.id),
            Err(DoctorError::NotFound(_))
        ));
    }

    #[test]
    fn blank_names_rejected() {
        let conn = test_db();
        let user = make_user(&conn, "doc@example.org");
        assert!(matches!(
            create_doctor(&conn, &user, input("  ", "Martin"), Utc::now()),
            Err(DoctorError::Validation(ValidationError::MissingField("first_name")))
        ));
    }

    #[test]
    fn deactivated_doctor_leaves_search() {
        let conn = test_db();
        let user = make_user(&conn, "doc@example.org");
        let doc = create_doctor(&conn, &user, input("Claire", "Martin"), Utc::now()).unwrap();
        set_doctor_active(&conn, &user, &doc.id, false, Utc::now()).unwrap();
        assert!(db::search_doctors(&conn, &user, "martin").unwrap().is_empty());
    }

    #[test]
    fn import_assigns_new_local_identity() {
        let conn = test_db();
        let user = make_user(&conn, "doc@example.org");
        let candidate = external("Hugo", "Bernard", Some("10009998887"));

        let imported = import_external(&conn, &user, &candidate, Utc::now()).unwrap();
        assert_ne!(imported.id, candidate.id);
        assert_eq!(imported.source, DoctorSource::Local);
        assert_eq!(imported.user_id, Some(user));

        // Importing the same registration again returns the stored entry
        let again = import_external(&conn, &user, &candidate, Utc::now()).unwrap();
        assert_eq!(again.id, imported.id);
        assert_eq!(list_doctors(&conn, &user).unwrap().len(), 1);
    }

    #[test]
    fn local_entries_cannot_be_imported() {
        let conn = test_db();
        let user = make_user(&conn, "doc@example.org");
        let doc = create_doctor(&conn, &user, input("Claire", "Martin"), Utc::now()).unwrap();
        assert!(matches!(
            import_external(&conn, &user, &doc, Utc::now()),
            Err(DoctorError::AlreadyLocal(_))
        ));
    }
}
