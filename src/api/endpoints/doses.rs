//! Daily dose endpoints.
//!
//! - `GET /api/doses?date=`: materialize and show one day (default today)
//! - `POST /api/doses/:id/toggle`: flip one dose
//! - `POST /api/doses/group`: set or toggle one time-of-day group
//! - `POST /api/doses/all`: set or toggle the whole day
//! - `GET /api/doses/calendar?from=&to=`: per-day counts for the month view
//!
//! Every day response also reschedules the user's reminders for that day.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::{self, DaySummary};
use crate::ledger::{self, DayLedger, DoseGroup, Progress};
use crate::models::TimeOfDay;

#[derive(Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct GroupRequest {
    pub date: Option<NaiveDate>,
    pub time_of_day: TimeOfDay,
    /// Explicit state; toggles when absent.
    pub taken: Option<bool>,
}

#[derive(Deserialize)]
pub struct AllRequest {
    pub date: Option<NaiveDate>,
    pub taken: Option<bool>,
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Serialize)]
pub struct DayResponse {
    pub date: NaiveDate,
    pub progress: Progress,
    pub groups: Vec<DoseGroup>,
    pub reminders_scheduled: usize,
}

#[derive(Serialize)]
pub struct CalendarResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DaySummary>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn load_day(ctx: &ApiContext, user: &UserContext, date: NaiveDate) -> Result<DayLedger, ApiError> {
    Ok(DayLedger::load(ctx.core.dose_store(), user.user_id, date)?)
}

fn day_response(ctx: &ApiContext, user: &UserContext, ledger: &DayLedger) -> DayResponse {
    let groups = ledger.groups();
    let reminders_scheduled = ctx
        .core
        .reminders
        .schedule_day(&user.user_id, ledger.date(), &groups, Utc::now());
    DayResponse {
        date: ledger.date(),
        progress: ledger.progress(),
        groups,
        reminders_scheduled,
    }
}

pub async fn day(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayResponse>, ApiError> {
    let ledger = load_day(&ctx, &user, query.date.unwrap_or_else(today))?;
    Ok(Json(day_response(&ctx, &user, &ledger)))
}

pub async fn toggle(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(dose_id): Path<Uuid>,
) -> Result<Json<DayResponse>, ApiError> {
    let dose = ctx
        .core
        .with_conn(|conn| db::get_dose(conn, &user.user_id, &dose_id))?
        .ok_or_else(|| ApiError::NotFound(format!("Dose {dose_id} not found")))?;

    let mut ledger = load_day(&ctx, &user, dose.scheduled_date)?;
    ledger.toggle_dose(dose_id, Utc::now())?;
    Ok(Json(day_response(&ctx, &user, &ledger)))
}

pub async fn group(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<GroupRequest>,
) -> Result<Json<DayResponse>, ApiError> {
    let mut ledger = load_day(&ctx, &user, req.date.unwrap_or_else(today))?;
    let now = Utc::now();
    match req.taken {
        Some(taken) => {
            ledger.set_group(&req.time_of_day, taken, now)?;
        }
        None => {
            ledger.toggle_group(&req.time_of_day, now)?;
        }
    }
    Ok(Json(day_response(&ctx, &user, &ledger)))
}

pub async fn all(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(req): Json<AllRequest>,
) -> Result<Json<DayResponse>, ApiError> {
    let mut ledger = load_day(&ctx, &user, req.date.unwrap_or_else(today))?;
    let now = Utc::now();
    match req.taken {
        Some(taken) => {
            ledger.set_all(taken, now)?;
        }
        None => {
            ledger.toggle_all(now)?;
        }
    }
    Ok(Json(day_response(&ctx, &user, &ledger)))
}

pub async fn calendar(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let store = ctx.core.dose_store();
    let days = ledger::calendar_summary(store.as_ref(), &user.user_id, query.from, query.to)?;
    Ok(Json(CalendarResponse {
        from: query.from,
        to: query.to,
        days,
    }))
}
