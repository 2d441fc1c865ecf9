//! Medication endpoints.
//!
//! - `GET /api/medications`: the user's schedules
//! - `POST /api/medications`: create
//! - `GET|PUT|DELETE /api/medications/:id`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::medications;
use crate::models::{Medication, MedicationInput};

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    let meds = ctx
        .core
        .with_conn(|conn| medications::list_medications(conn, &user.user_id))?;
    Ok(Json(meds))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(input): Json<MedicationInput>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    let med = ctx
        .core
        .with_conn(|conn| medications::create_medication(conn, &user.user_id, input, Utc::now()))?;
    Ok((StatusCode::CREATED, Json(med)))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(med_id): Path<Uuid>,
) -> Result<Json<Medication>, ApiError> {
    let med = ctx
        .core
        .with_conn(|conn| medications::get_medication(conn, &user.user_id, &med_id))?;
    Ok(Json(med))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(med_id): Path<Uuid>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    let med = ctx.core.with_conn(|conn| {
        medications::update_medication(conn, &user.user_id, &med_id, input, Utc::now())
    })?;
    Ok(Json(med))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(med_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.core
        .with_conn(|conn| medications::delete_medication(conn, &user.user_id, &med_id))?;
    Ok(StatusCode::NO_CONTENT)
}
