//! Merged doctor search: the user's directory first, then the external
//! source, deduplicated and ranked.

use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Doctor, DoctorSource};
use crate::store::{DoctorDirectory, ExternalDoctorSource};

/// Search local and external doctors for `query`.
///
/// Only a local failure is an error. When the external source fails the
/// local results are returned alone.
pub fn search_doctors(
    directory: &dyn DoctorDirectory,
    external: Option<&dyn ExternalDoctorSource>,
    user_id: &Uuid,
    query: &str,
) -> Result<Vec<Doctor>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = directory.search_doctors_local(user_id, query)?;
    if let Some(source) = external {
        match source.search(query) {
            Ok(found) => candidates.extend(found.into_iter().map(|mut doctor| {
                doctor.user_id = None;
                doctor.source = DoctorSource::External(source.name().to_string());
                doctor
            })),
            Err(e) => {
                tracing::warn!(source = source.name(), error = %e, "External doctor search failed, using local results");
            }
        }
    }

    let mut results = dedupe(candidates);
    rank(&mut results, query);
    Ok(results)
}

/// Same person: equal names (case-insensitive) and registration numbers
/// that do not contradict each other.
pub fn same_doctor(a: &Doctor, b: &Doctor) -> bool {
    let names_match = fold(&a.first_name) == fold(&b.first_name) && fold(&a.last_name) == fold(&b.last_name);
    if !names_match {
        return false;
    }
    match (&a.registration_number, &b.registration_number) {
        (Some(x), Some(y)) => x.trim() == y.trim(),
        _ => true,
    }
}

/// Keep the first of every group of duplicates, in input order.
fn dedupe(candidates: Vec<Doctor>) -> Vec<Doctor> {
    let mut kept: Vec<Doctor> = Vec::with_capacity(candidates.len());
    for doctor in candidates {
        if !kept.iter().any(|k| same_doctor(k, &doctor)) {
            kept.push(doctor);
        }
    }
    kept
}

fn rank(doctors: &mut [Doctor], query: &str) {
    let query = collapse(query);
    doctors.sort_by(|a, b| {
        b.source
            .is_local()
            .cmp(&a.source.is_local())
            .then_with(|| is_exact(b, &query).cmp(&is_exact(a, &query)))
            .then_with(|| b.specialty.is_some().cmp(&a.specialty.is_some()))
            .then_with(|| fold(&a.last_name).cmp(&fold(&b.last_name)))
    });
}

fn is_exact(doctor: &Doctor, query: &str) -> bool {
    let first = fold(&doctor.first_name);
    let last = fold(&doctor.last_name);
    query == format!("{first} {last}") || query == format!("{last} {first}")
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Lowercase with runs of whitespace reduced to one space.
fn collapse(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
