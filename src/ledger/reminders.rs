//! In-session dose reminders.
//!
//! Viewing a day schedules one delayed task per time-of-day group that still
//! has untaken doses. Viewing another day or changing settings reschedules
//! them; logging out cancels them.
//! Nothing here survives a restart.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{DoseGroup, LedgerError};
use crate::models::TimeOfDay;

const CLOCK_FORMAT: &str = "%H:%M";
const MAX_LEAD_MINUTES: u32 = 120;

/// Clock times of the four canonical slots, as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTimes {
    pub morning: String,
    pub noon: String,
    pub evening: String,
    pub night: String,
}

impl Default for SlotTimes {
    fn default() -> Self {
        Self {
            morning: "08:00".into(),
            noon: "12:00".into(),
            evening: "19:00".into(),
            night: "22:00".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    /// How long before the slot the reminder fires.
    pub lead_minutes: u32,
    #[serde(default)]
    pub slot_times: SlotTimes,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_minutes: 5,
            slot_times: SlotTimes::default(),
        }
    }
}

impl ReminderSettings {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.lead_minutes > MAX_LEAD_MINUTES {
            return Err(LedgerError::InvalidReminder(format!(
                "lead time above {MAX_LEAD_MINUTES} minutes"
            )));
        }
        let times = &self.slot_times;
        for (slot, value) in [
            ("morning", &times.morning),
            ("noon", &times.noon),
            ("evening", &times.evening),
            ("night", &times.night),
        ] {
            parse_clock(value)
                .ok_or_else(|| LedgerError::InvalidReminder(format!("{slot}: '{value}' is not HH:MM")))?;
        }
        Ok(())
    }

    /// Clock time a slot is due at. Custom tags only have one when they are
    /// written as `HH:MM`.
    pub fn clock_time(&self, slot: &TimeOfDay) -> Option<NaiveTime> {
        match slot {
            TimeOfDay::Morning => parse_clock(&self.slot_times.morning),
            TimeOfDay::Noon => parse_clock(&self.slot_times.noon),
            TimeOfDay::Evening => parse_clock(&self.slot_times.evening),
            TimeOfDay::Night => parse_clock(&self.slot_times.night),
            TimeOfDay::Custom(tag) => parse_clock(tag),
        }
    }

    /// Instant the reminder for `slot` on `date` fires, in server local time.
    pub fn due_at(&self, date: NaiveDate, slot: &TimeOfDay) -> Option<DateTime<Utc>> {
        let clock = self.clock_time(slot)?;
        let local = Local.from_local_datetime(&date.and_time(clock)).earliest()?;
        Some(local.with_timezone(&Utc) - chrono::Duration::minutes(i64::from(self.lead_minutes)))
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), CLOCK_FORMAT).ok()
}

/// A fired reminder waiting to be picked up by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderNotice {
    pub date: NaiveDate,
    pub time_of_day: TimeOfDay,
    pub due_at: DateTime<Utc>,
    pub medications: Vec<String>,
}

/// Fired notices kept per user between polls. Older ones are dropped first.
pub const MAX_QUEUED_NOTICES: usize = 32;

#[derive(Default)]
struct UserReminders {
    settings: ReminderSettings,
    /// Day on screen, kept so a settings change can reschedule it.
    visible: Option<(NaiveDate, Vec<DoseGroup>)>,
    timers: Vec<JoinHandle<()>>,
    notices: Arc<Mutex<VecDeque<ReminderNotice>>>,
}

impl UserReminders {
    fn abort_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    /// Replace the timers with ones for the visible day under current settings.
    fn reschedule(&mut self, user_id: &Uuid, now: DateTime<Utc>) -> usize {
        self.abort_timers();
        if !self.settings.enabled {
            return 0;
        }
        let Some((date, groups)) = &self.visible else {
            return 0;
        };
        let date = *date;

        for group in groups.iter().filter(|g| !g.all_taken()) {
            let Some(due_at) = self.settings.due_at(date, &group.time_of_day) else {
                continue;
            };
            let Ok(delay) = (due_at - now).to_std() else {
                continue;
            };

            let notice = ReminderNotice {
                date,
                time_of_day: group.time_of_day.clone(),
                due_at,
                medications: group
                    .doses
                    .iter()
                    .filter(|v| !v.dose.taken)
                    .map(|v| v.medication_name.clone())
                    .collect(),
            };
            self.timers.push(spawn_timer(*user_id, delay, notice, self.notices.clone()));
        }

        tracing::debug!(user = %user_id, %date, timers = self.timers.len(), "Reminders scheduled");
        self.timers.len()
    }
}

/// Per-user reminder timers, settings and fired notices.
#[derive(Default)]
pub struct ReminderRegistry {
    users: Mutex<HashMap<Uuid, UserReminders>>,
}

impl ReminderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_users(&self) -> MutexGuard<'_, HashMap<Uuid, UserReminders>> {
        // A poisoned map only holds timers and notices; keep using it.
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_user<T>(&self, user_id: &Uuid, f: impl FnOnce(&mut UserReminders) -> T) -> T {
        f(self.lock_users().entry(*user_id).or_default())
    }

    pub fn settings(&self, user_id: &Uuid) -> ReminderSettings {
        self.lock_users()
            .get(user_id)
            .map(|user| user.settings.clone())
            .unwrap_or_default()
    }

    /// Store new settings and reschedule the visible day with them.
    ///
    /// Returns how many timers are now running.
    pub fn update_settings(
        &self,
        user_id: &Uuid,
        settings: ReminderSettings,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        settings.validate()?;
        Ok(self.with_user(user_id, |user| {
            user.settings = settings;
            user.reschedule(user_id, now)
        }))
    }

    /// Replace the user's timers with ones for `groups` on `date`.
    ///
    /// Returns how many timers were started. Must run inside a tokio runtime.
    pub fn schedule_day(
        &self,
        user_id: &Uuid,
        date: NaiveDate,
        groups: &[DoseGroup],
        now: DateTime<Utc>,
    ) -> usize {
        self.with_user(user_id, |user| {
            user.visible = Some((date, groups.to_vec()));
            user.reschedule(user_id, now)
        })
    }

    /// Stop every timer and forget the visible day and queued notices.
    /// Users left on default settings are dropped entirely.
    pub fn cancel(&self, user_id: &Uuid) {
        let mut users = self.lock_users();
        let Some(user) = users.get_mut(user_id) else {
            return;
        };
        user.abort_timers();
        if user.settings == ReminderSettings::default() {
            users.remove(user_id);
        } else {
            user.visible = None;
            user.notices = Arc::default();
        }
    }

    /// Timers that have not fired yet.
    pub fn pending(&self, user_id: &Uuid) -> usize {
        self.lock_users()
            .get(user_id)
            .map_or(0, |user| user.timers.iter().filter(|t| !t.is_finished()).count())
    }

    /// Take every fired notice.
    pub fn drain_notices(&self, user_id: &Uuid) -> Vec<ReminderNotice> {
        let Some(notices) = self.lock_users().get(user_id).map(|user| user.notices.clone()) else {
            return Vec::new();
        };
        let mut queue = notices.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        queue.drain(..).collect()
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.lock_users().len()
    }
}

fn spawn_timer(
    user_id: Uuid,
    delay: Duration,
    notice: ReminderNotice,
    queue: Arc<Mutex<VecDeque<ReminderNotice>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        tracing::info!(user = %user_id, slot = %notice.time_of_day, "Dose reminder due");
        let mut queue = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        push_bounded(&mut queue, notice);
    })
}

fn push_bounded(queue: &mut VecDeque<ReminderNotice>, notice: ReminderNotice) {
    if queue.len() >= MAX_QUEUED_NOTICES {
        queue.pop_front();
    }
    queue.push_back(notice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::monday;
    use crate::models::{Dose, DoseView, Medication, MedicationInput, Weekday};

    fn group(slot: TimeOfDay, taken: &[bool]) -> DoseGroup {
        let med = Medication::new(
            Uuid::new_v4(),
            MedicationInput {
                name: "Amoxicillin".into(),
                dosage: "500 mg".into(),
                times_of_day: vec![slot.to_string()],
                weekdays: vec![Weekday::Monday],
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let doses: Vec<DoseView> = taken
            .iter()
            .map(|&t| {
                let mut dose = Dose::pending(&med, slot.clone(), monday(), Utc::now());
                dose.mark(t, Utc::now());
                DoseView::new(dose, &med)
            })
            .collect();
        DoseGroup {
            time_of_day: slot,
            taken: taken.iter().filter(|t| **t).count(),
            total: taken.len(),
            doses,
        }
    }

    /// A `now` that puts the slot's reminder `ms` milliseconds ahead.
    fn just_before(settings: &ReminderSettings, slot: &TimeOfDay, ms: i64) -> DateTime<Utc> {
        settings.due_at(monday(), slot).unwrap() - chrono::Duration::milliseconds(ms)
    }

    #[test]
    fn default_slot_clock_times() {
        let settings = ReminderSettings::default();
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0);
        assert_eq!(settings.clock_time(&TimeOfDay::Morning), at(8, 0));
        assert_eq!(settings.clock_time(&TimeOfDay::Noon), at(12, 0));
        assert_eq!(settings.clock_time(&TimeOfDay::Evening), at(19, 0));
        assert_eq!(settings.clock_time(&TimeOfDay::Night), at(22, 0));
        assert_eq!(settings.clock_time(&TimeOfDay::Custom("21:15".into())), at(21, 15));
        assert_eq!(settings.clock_time(&TimeOfDay::Custom("avant repas".into())), None);
    }

    #[test]
    fn settings_validation() {
        let mut settings = ReminderSettings::default();
        assert!(settings.validate().is_ok());
        settings.slot_times.noon = "midday".into();
        assert!(matches!(settings.validate(), Err(LedgerError::InvalidReminder(_))));
        settings.slot_times.noon = "12:30".into();
        settings.lead_minutes = 500;
        assert!(settings.validate().is_err());
    }

    #[tokio::test]
    async fn timer_fires_for_untaken_group() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let settings = registry.settings(&user);
        let now = just_before(&settings, &TimeOfDay::Morning, 30);

        let groups = vec![group(TimeOfDay::Morning, &[false, true])];
        assert_eq!(registry.schedule_day(&user, monday(), &groups, now), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let notices = registry.drain_notices(&user);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].time_of_day, TimeOfDay::Morning);
        assert_eq!(notices[0].medications, vec!["Amoxicillin".to_string()]);
        assert!(registry.drain_notices(&user).is_empty());
        assert_eq!(registry.pending(&user), 0);
    }

    #[tokio::test]
    async fn completed_past_and_untimed_groups_are_skipped() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let settings = registry.settings(&user);
        let now = just_before(&settings, &TimeOfDay::Evening, 1_000);

        let groups = vec![
            group(TimeOfDay::Morning, &[false]),
            group(TimeOfDay::Evening, &[true, true]),
            group(TimeOfDay::Custom("avant repas".into()), &[false]),
            group(TimeOfDay::Night, &[false]),
        ];
        // Morning is past, evening is done, the custom tag has no clock time
        assert_eq!(registry.schedule_day(&user, monday(), &groups, now), 1);
        registry.cancel(&user);
    }

    #[tokio::test]
    async fn rescheduling_cancels_previous_view() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let settings = registry.settings(&user);
        let now = just_before(&settings, &TimeOfDay::Noon, 150);

        registry.schedule_day(&user, monday(), &[group(TimeOfDay::Noon, &[false])], now);
        registry.schedule_day(&user, monday(), &[], now);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(registry.drain_notices(&user).is_empty());
    }

    #[tokio::test]
    async fn cancel_stops_pending_timers() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let settings = registry.settings(&user);
        let now = just_before(&settings, &TimeOfDay::Night, 150);

        registry.schedule_day(&user, monday(), &[group(TimeOfDay::Night, &[false])], now);
        assert_eq!(registry.pending(&user), 1);
        registry.cancel(&user);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(registry.drain_notices(&user).is_empty());
    }

    #[tokio::test]
    async fn disabled_settings_schedule_nothing() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let settings = ReminderSettings {
            enabled: false,
            ..Default::default()
        };
        registry.update_settings(&user, settings.clone(), Utc::now()).unwrap();
        let now = just_before(&settings, &TimeOfDay::Morning, 60_000);
        assert_eq!(
            registry.schedule_day(&user, monday(), &[group(TimeOfDay::Morning, &[false])], now),
            0
        );
    }

    #[tokio::test]
    async fn settings_change_reschedules_visible_day() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let defaults = ReminderSettings::default();
        let now = just_before(&defaults, &TimeOfDay::Morning, 60_000);
        let groups = vec![group(TimeOfDay::Morning, &[false]), group(TimeOfDay::Night, &[false])];
        assert_eq!(registry.schedule_day(&user, monday(), &groups, now), 2);

        let disabled = ReminderSettings {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(registry.update_settings(&user, disabled, now).unwrap(), 0);
        assert_eq!(registry.pending(&user), 0);

        assert_eq!(registry.update_settings(&user, defaults.clone(), now).unwrap(), 2);
        assert_eq!(registry.pending(&user), 2);

        // Morning moved earlier than `now`: only night is still ahead
        let mut earlier = defaults;
        earlier.slot_times.morning = "06:00".into();
        assert_eq!(registry.update_settings(&user, earlier, now).unwrap(), 1);
        registry.cancel(&user);
    }

    #[tokio::test]
    async fn lead_time_change_moves_due_instant() {
        let registry = ReminderRegistry::new();
        let user = Uuid::new_v4();
        let defaults = ReminderSettings::default();
        // Due 60s out with the default 5 minute lead
        let now = just_before(&defaults, &TimeOfDay::Noon, 60_000);
        registry.schedule_day(&user, monday(), &[group(TimeOfDay::Noon, &[false])], now);

        // Four more minutes of lead puts the reminder in the past
        let longer = ReminderSettings {
            lead_minutes: 9,
            ..Default::default()
        };
        assert_eq!(registry.update_settings(&user, longer, now).unwrap(), 0);
        assert_eq!(registry.pending(&user), 0);
    }

    #[tokio::test]
    async fn cancel_releases_default_users() {
        let registry = ReminderRegistry::new();
        let plain = Uuid::new_v4();
        let tuned = Uuid::new_v4();
        let tuned_settings = ReminderSettings {
            lead_minutes: 15,
            ..Default::default()
        };
        registry.update_settings(&tuned, tuned_settings.clone(), Utc::now()).unwrap();
        registry.schedule_day(&plain, monday(), &[], Utc::now());
        assert_eq!(registry.tracked_users(), 2);

        registry.cancel(&plain);
        registry.cancel(&tuned);
        assert_eq!(registry.tracked_users(), 1);
        assert_eq!(registry.settings(&tuned), tuned_settings);

        // Reads do not create entries
        let stranger = Uuid::new_v4();
        assert_eq!(registry.pending(&stranger), 0);
        assert!(registry.drain_notices(&stranger).is_empty());
        assert_eq!(registry.settings(&stranger), ReminderSettings::default());
        assert_eq!(registry.tracked_users(), 1);
    }

    #[test]
    fn notice_queue_keeps_newest() {
        let mut queue = VecDeque::new();
        for minute in 0..(MAX_QUEUED_NOTICES as i64 + 3) {
            push_bounded(
                &mut queue,
                ReminderNotice {
                    date: monday(),
                    time_of_day: TimeOfDay::Morning,
                    due_at: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::minutes(minute),
                    medications: Vec::new(),
                },
            );
        }
        assert_eq!(queue.len(), MAX_QUEUED_NOTICES);
        assert_eq!(
            queue.front().map(|n| n.due_at),
            Some(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::minutes(3))
        );
    }
}
