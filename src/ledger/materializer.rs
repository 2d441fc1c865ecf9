use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::LedgerError;
use crate::models::{Dose, DoseView, Medication, Weekday};
use crate::store::DoseStore;

/// Doses that must exist on `date` but are not in `existing`.
///
/// One per (medication, time of day) for every medication active on the
/// date's weekday. Pure; the caller decides whether to write.
pub fn plan_missing_doses(
    medications: &[Medication],
    existing: &[Dose],
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<Dose> {
    let weekday = Weekday::of(date);
    medications
        .iter()
        .filter(|med| med.is_active_on(weekday))
        .flat_map(|med| {
            med.times_of_day
                .iter()
                .filter(|slot| !existing.iter().any(|dose| dose.matches(&med.id, slot)))
                .map(|slot| Dose::pending(med, slot.clone(), date, now))
        })
        .collect()
}

/// Make sure every scheduled dose of `date` exists, then return the whole day.
///
/// Safe to call any number of times: existing slots are never duplicated,
/// and the storage layer ignores a slot that another writer created first.
pub fn materialize_day(
    store: &dyn DoseStore,
    user_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<DoseView>, LedgerError> {
    let medications = store.list_medications_for_user(user_id)?;
    let mut doses = store.list_doses_for_date(user_id, date)?;

    let staged = plan_missing_doses(&medications, &doses, date, Utc::now());
    if !staged.is_empty() {
        let inserted = store.insert_doses(&staged)?;
        tracing::info!(user = %user_id, %date, count = inserted.len(), "Materialized doses");
        if inserted.len() < staged.len() {
            tracing::debug!(
                user = %user_id,
                %date,
                staged = staged.len(),
                inserted = inserted.len(),
                "Concurrent materialization detected, re-reading day"
            );
            doses = store.list_doses_for_date(user_id, date)?;
        } else {
            doses.extend(inserted);
        }
    }

    Ok(join_medications(doses, &medications))
}

/// Attach display fields and order by slot, then medication name.
fn join_medications(doses: Vec<Dose>, medications: &[Medication]) -> Vec<DoseView> {
    let by_id: HashMap<Uuid, &Medication> = medications.iter().map(|m| (m.id, m)).collect();

    let mut views: Vec<DoseView> = doses
        .into_iter()
        .filter_map(|dose| match by_id.get(&dose.medication_id) {
            Some(med) => Some(DoseView::new(dose, med)),
            None => {
                tracing::warn!(dose = %dose.id, "Dose without medication skipped");
                None
            }
        })
        .collect();

    views.sort_by(|a, b| {
        a.dose
            .time_of_day
            .cmp(&b.dose.time_of_day)
            .then_with(|| a.medication_name.to_lowercase().cmp(&b.medication_name.to_lowercase()))
    });
    views
}
