//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::accounts::AccountError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::doctors::DoctorError;
use crate::ledger::LedgerError;
use crate::medications::MedicationError;
use crate::models::ValidationError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Too many failed logins")]
    LoginLocked { retry_after: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::LoginLocked { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "LOGIN_LOCKED",
                format!("Too many failed logins. Retry after {retry_after}s"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } | ApiError::LoginLocked { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => ApiError::NotFound(format!("{entity_type} {id} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Database(e) => e.into(),
            LedgerError::UnknownDose(id) => ApiError::NotFound(format!("Dose {id} not found")),
            other @ (LedgerError::InvalidReminder(_) | LedgerError::InvalidRange { .. }) => {
                ApiError::BadRequest(other.to_string())
            }
        }
    }
}

impl From<MedicationError> for ApiError {
    fn from(err: MedicationError) -> Self {
        match err {
            MedicationError::Database(e) => e.into(),
            MedicationError::Validation(e) => e.into(),
            MedicationError::NotFound(id) => ApiError::NotFound(format!("Medication {id} not found")),
            other @ MedicationError::UnknownDoctor(_) => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<DoctorError> for ApiError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::Database(e) => e.into(),
            DoctorError::Validation(e) => e.into(),
            DoctorError::NotFound(id) => ApiError::NotFound(format!("Doctor {id} not found")),
            other @ DoctorError::AlreadyLocal(_) => ApiError::Conflict(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Database(e) => e.into(),
            AccountError::Validation(e) => e.into(),
            AccountError::EmailTaken => ApiError::Conflict(AccountError::EmailTaken.to_string()),
            AccountError::InvalidCredentials => ApiError::Unauthorized,
            AccountError::ProfileMissing(id) => ApiError::NotFound(format!("Profile for {id} not found")),
        }
    }
}
