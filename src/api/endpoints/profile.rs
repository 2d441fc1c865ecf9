//! Profile endpoints: `GET|PUT /api/profile`.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;

use crate::accounts;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::{ProfileInput, UserProfile};

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = ctx.core.with_conn(|conn| accounts::get_profile(conn, &user.user_id))?;
    Ok(Json(profile))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = ctx
        .core
        .with_conn(|conn| accounts::update_profile(conn, &user.user_id, input, Utc::now()))?;
    Ok(Json(profile))
}
