use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{materialize_day, LedgerError};
use crate::db::DaySummary;
use crate::models::{DoseView, TimeOfDay};
use crate::store::DoseStore;

/// Longest range a calendar summary may cover.
pub const MAX_CALENDAR_DAYS: i64 = 366;

/// Doses sharing one time of day, with completion counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseGroup {
    pub time_of_day: TimeOfDay,
    pub taken: usize,
    pub total: usize,
    pub doses: Vec<DoseView>,
}

impl DoseGroup {
    pub fn all_taken(&self) -> bool {
        self.taken == self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub taken: usize,
    pub total: usize,
}

/// One user's doses for one date, owned in memory and kept in step with storage.
///
/// Every change is written through the store first and only mirrored into
/// the owned list once the write succeeded.
pub struct DayLedger {
    store: Arc<dyn DoseStore>,
    user_id: Uuid,
    date: NaiveDate,
    doses: Vec<DoseView>,
}

impl DayLedger {
    /// Materialize `date` and take ownership of the result.
    pub fn load(store: Arc<dyn DoseStore>, user_id: Uuid, date: NaiveDate) -> Result<Self, LedgerError> {
        let doses = materialize_day(store.as_ref(), &user_id, date)?;
        Ok(Self {
            store,
            user_id,
            date,
            doses,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn doses(&self) -> &[DoseView] {
        &self.doses
    }

    /// Flip one dose. Returns the updated view.
    pub fn toggle_dose(&mut self, dose_id: Uuid, now: DateTime<Utc>) -> Result<&DoseView, LedgerError> {
        let index = self
            .doses
            .iter()
            .position(|v| v.dose.id == dose_id)
            .ok_or(LedgerError::UnknownDose(dose_id))?;
        let taken = !self.doses[index].dose.taken;

        let changed = self.store.update_dose_state(&self.user_id, &[dose_id], taken, now)?;
        if changed == 0 {
            return Err(LedgerError::UnknownDose(dose_id));
        }
        self.doses[index].dose.mark(taken, now);
        tracing::debug!(dose = %dose_id, taken, "Dose toggled");
        Ok(&self.doses[index])
    }

    /// Set every dose of one time of day. Returns how many doses it covered.
    pub fn set_group(&mut self, slot: &TimeOfDay, taken: bool, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        let ids: Vec<Uuid> = self
            .doses
            .iter()
            .filter(|v| &v.dose.time_of_day == slot)
            .map(|v| v.dose.id)
            .collect();
        self.write_through(&ids, taken, now)
    }

    /// Mark the group taken, or untaken when it already is. Returns the new state.
    pub fn toggle_group(&mut self, slot: &TimeOfDay, now: DateTime<Utc>) -> Result<bool, LedgerError> {
        let mut group = self.doses.iter().filter(|v| &v.dose.time_of_day == slot).peekable();
        let taken = group.peek().is_none() || !group.all(|v| v.dose.taken);
        self.set_group(slot, taken, now)?;
        Ok(taken)
    }

    pub fn set_all(&mut self, taken: bool, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        let ids: Vec<Uuid> = self.doses.iter().map(|v| v.dose.id).collect();
        self.write_through(&ids, taken, now)
    }

    /// Same rule as `toggle_group`, over the whole day.
    pub fn toggle_all(&mut self, now: DateTime<Utc>) -> Result<bool, LedgerError> {
        let taken = self.doses.is_empty() || !self.doses.iter().all(|v| v.dose.taken);
        self.set_all(taken, now)?;
        Ok(taken)
    }

    fn write_through(&mut self, ids: &[Uuid], taken: bool, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.store.update_dose_state(&self.user_id, ids, taken, now)?;
        for view in self.doses.iter_mut().filter(|v| ids.contains(&v.dose.id)) {
            view.dose.mark(taken, now);
        }
        tracing::debug!(user = %self.user_id, date = %self.date, count = ids.len(), taken, "Doses updated");
        Ok(ids.len())
    }

    /// Doses grouped by time of day, in day order.
    pub fn groups(&self) -> Vec<DoseGroup> {
        let mut groups: Vec<DoseGroup> = Vec::new();
        for view in &self.doses {
            let slot = &view.dose.time_of_day;
            let index = match groups.iter().position(|g| &g.time_of_day == slot) {
                Some(i) => i,
                None => {
                    groups.push(DoseGroup {
                        time_of_day: slot.clone(),
                        taken: 0,
                        total: 0,
                        doses: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];
            group.total += 1;
            group.taken += usize::from(view.dose.taken);
            group.doses.push(view.clone());
        }
        groups.sort_by(|a, b| a.time_of_day.cmp(&b.time_of_day));
        groups
    }

    pub fn progress(&self) -> Progress {
        Progress {
            taken: self.doses.iter().filter(|v| v.dose.taken).count(),
            total: self.doses.len(),
        }
    }
}

/// Taken/total counts per day over `[from, to]`, for the month view.
///
/// Only days that were already materialized appear.
pub fn calendar_summary(
    store: &dyn DoseStore,
    user_id: &Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DaySummary>, LedgerError> {
    if from > to || (to - from).num_days() >= MAX_CALENDAR_DAYS {
        return Err(LedgerError::InvalidRange { from, to });
    }
    Ok(store.summarize_doses(user_id, from, to)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::*;
    use crate::models::Weekday;
    use crate::store::SqliteStore;

    fn ledger_with(meds: &[(&str, &[&str])]) -> (Arc<SqliteStore>, Uuid, DayLedger) {
        let (store, user) = store_with_user();
        for (name, times) in meds {
            add_medication(&store, user, name, times, &[Weekday::Monday]);
        }
        let store = Arc::new(store);
        let ledger = DayLedger::load(store.clone(), user, monday()).unwrap();
        (store, user, ledger)
    }

    fn stored_state(store: &SqliteStore, user: &Uuid) -> Vec<(String, bool)> {
        let mut rows: Vec<_> = store
            .list_doses_for_date(user, monday())
            .unwrap()
            .into_iter()
            .map(|d| {
                assert_eq!(d.taken, d.taken_at.is_some());
                (d.time_of_day.to_string(), d.taken)
            })
            .collect();
        rows.sort();
        rows
    }

    #[test]
    fn single_toggle_stamps_and_clears() {
        let (store, user, mut ledger) = ledger_with(&[("Amoxicillin", &["morning", "evening"])]);
        let id = ledger.doses()[0].dose.id;

        let now = Utc::now();
        let view = ledger.toggle_dose(id, now).unwrap();
        assert!(view.dose.taken);
        assert_eq!(view.dose.taken_at, Some(now));

        let view = ledger.toggle_dose(id, Utc::now()).unwrap();
        assert!(!view.dose.taken);
        assert!(view.dose.taken_at.is_none());
        assert!(stored_state(&store, &user).iter().all(|(_, taken)| !taken));
    }

    #[test]
    fn unknown_dose_is_rejected() {
        let (_store, _user, mut ledger) = ledger_with(&[("Amoxicillin", &["morning"])]);
        let stray = Uuid::new_v4();
        assert!(matches!(
            ledger.toggle_dose(stray, Utc::now()),
            Err(LedgerError::UnknownDose(id)) if id == stray
        ));
    }

    #[test]
    fn group_toggle_touches_only_its_slot() {
        let (store, user, mut ledger) = ledger_with(&[
            ("Amoxicillin", &["morning", "evening"]),
            ("Kardegic", &["morning"]),
            ("Stilnox", &["night"]),
        ]);

        let taken = ledger.toggle_group(&TimeOfDay::Morning, Utc::now()).unwrap();
        assert!(taken);
        for view in ledger.doses() {
            assert_eq!(view.dose.taken, view.dose.time_of_day == TimeOfDay::Morning);
        }
        assert_eq!(
            stored_state(&store, &user),
            vec![
                ("evening".to_string(), false),
                ("morning".to_string(), true),
                ("morning".to_string(), true),
                ("night".to_string(), false),
            ]
        );
    }

    #[test]
    fn group_toggle_completes_partial_group_then_clears() {
        let (_store, _user, mut ledger) = ledger_with(&[
            ("Amoxicillin", &["morning"]),
            ("Kardegic", &["morning"]),
        ]);
        let first = ledger.doses()[0].dose.id;
        ledger.toggle_dose(first, Utc::now()).unwrap();

        assert!(ledger.toggle_group(&TimeOfDay::Morning, Utc::now()).unwrap());
        assert_eq!(ledger.progress(), Progress { taken: 2, total: 2 });

        assert!(!ledger.toggle_group(&TimeOfDay::Morning, Utc::now()).unwrap());
        assert_eq!(ledger.progress(), Progress { taken: 0, total: 2 });
    }

    #[test]
    fn custom_slot_group_is_matched_exactly() {
        let (_store, _user, mut ledger) = ledger_with(&[
            ("Insulin", &["avant repas", "morning"]),
            ("Metformin", &["Avant repas"]),
        ]);
        let count = ledger
            .set_group(&TimeOfDay::Custom("avant repas".into()), true, Utc::now())
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(ledger.progress().taken, 1);
    }

    #[test]
    fn toggle_all_and_set_all() {
        let (store, user, mut ledger) = ledger_with(&[
            ("Amoxicillin", &["morning", "evening"]),
            ("Stilnox", &["night"]),
        ]);
        assert!(ledger.toggle_all(Utc::now()).unwrap());
        assert!(stored_state(&store, &user).iter().all(|(_, taken)| *taken));

        assert!(!ledger.toggle_all(Utc::now()).unwrap());
        assert_eq!(ledger.progress(), Progress { taken: 0, total: 3 });

        assert_eq!(ledger.set_all(true, Utc::now()).unwrap(), 3);
        assert_eq!(ledger.progress(), Progress { taken: 3, total: 3 });
    }

    #[test]
    fn groups_are_in_day_order_with_counts() {
        let (_store, _user, mut ledger) = ledger_with(&[
            ("Amoxicillin", &["evening", "morning"]),
            ("Kardegic", &["noon", "morning"]),
        ]);
        ledger.set_group(&TimeOfDay::Noon, true, Utc::now()).unwrap();

        let groups = ledger.groups();
        let summary: Vec<_> = groups
            .iter()
            .map(|g| (g.time_of_day.as_str(), g.taken, g.total))
            .collect();
        assert_eq!(summary, vec![("morning", 0, 2), ("noon", 1, 1), ("evening", 0, 1)]);
        assert!(groups[1].all_taken());
    }

    #[test]
    fn reload_sees_written_state() {
        let (store, user, mut ledger) = ledger_with(&[("Amoxicillin", &["morning", "evening"])]);
        ledger.set_group(&TimeOfDay::Evening, true, Utc::now()).unwrap();

        let reloaded = DayLedger::load(store, user, monday()).unwrap();
        assert_eq!(reloaded.doses(), ledger.doses());
    }

    #[test]
    fn calendar_summary_rejects_backwards_range() {
        let (store, user, _ledger) = ledger_with(&[("Amoxicillin", &["morning"])]);
        let err = calendar_summary(store.as_ref(), &user, monday(), monday().pred_opt().unwrap())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRange { .. }));

        let days = calendar_summary(store.as_ref(), &user, monday(), monday()).unwrap();
        assert_eq!(days, vec![DaySummary { date: monday(), total: 1, taken: 0 }]);
    }
}
