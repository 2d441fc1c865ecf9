//! Doctor directory endpoints.
//!
//! Local entries are managed with plain CRUD. `GET /api/doctors/search`
//! merges local matches with the external registry, and
//! `POST /api/doctors/import` copies an external result into the
//! user's own directory.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::doctors;
use crate::models::{Doctor, DoctorInput};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    let list = ctx
        .core
        .with_conn(|conn| doctors::list_doctors(conn, &user.user_id))?;
    Ok(Json(list))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(input): Json<DoctorInput>,
) -> Result<(StatusCode, Json<Doctor>), ApiError> {
    let doctor = ctx
        .core
        .with_conn(|conn| doctors::create_doctor(conn, &user.user_id, input, Utc::now()))?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(doctor_id): Path<Uuid>,
    Json(input): Json<DoctorInput>,
) -> Result<Json<Doctor>, ApiError> {
    let doctor = ctx.core.with_conn(|conn| {
        doctors::update_doctor(conn, &user.user_id, &doctor_id, input, Utc::now())
    })?;
    Ok(Json(doctor))
}

/// `POST /api/doctors/:id/active`: hide or show a doctor in searches.
pub async fn set_active(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(doctor_id): Path<Uuid>,
    Json(req): Json<ActiveRequest>,
) -> Result<Json<Doctor>, ApiError> {
    let doctor = ctx.core.with_conn(|conn| {
        doctors::set_doctor_active(conn, &user.user_id, &doctor_id, req.active, Utc::now())
    })?;
    Ok(Json(doctor))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.core
        .with_conn(|conn| doctors::delete_doctor(conn, &user.user_id, &doctor_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    let results = doctors::search_doctors(
        ctx.core.directory(),
        ctx.core.external(),
        &user.user_id,
        &query.q,
    )?;
    Ok(Json(results))
}

pub async fn import(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(candidate): Json<Doctor>,
) -> Result<Json<Doctor>, ApiError> {
    let doctor = ctx
        .core
        .with_conn(|conn| doctors::import_external(conn, &user.user_id, &candidate, Utc::now()))?;
    Ok(Json(doctor))
}
