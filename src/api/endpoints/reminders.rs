//! Reminder endpoints: settings and polling for fired notices.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::ledger::{ReminderNotice, ReminderSettings};

pub async fn get_settings(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Json<ReminderSettings> {
    Json(ctx.core.reminders.settings(&user.user_id))
}

/// Replace the settings. Reminders for the day on screen are rescheduled
/// with them.
pub async fn put_settings(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(settings): Json<ReminderSettings>,
) -> Result<Json<ReminderSettings>, ApiError> {
    let timers = ctx.core.reminders.update_settings(&user.user_id, settings, Utc::now())?;
    tracing::debug!(user = %user.user_id, timers, "Reminder settings updated");
    Ok(Json(ctx.core.reminders.settings(&user.user_id)))
}

/// `GET /api/reminders/pending`: notices fired since the last poll.
pub async fn pending(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Json<Vec<ReminderNotice>> {
    Json(ctx.core.reminders.drain_notices(&user.user_id))
}
