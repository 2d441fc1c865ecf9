//! Account endpoints.
//!
//! `POST /api/auth/register` and `POST /api/auth/login` are unprotected and
//! hand out a bearer token. `POST /api/auth/logout` revokes it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::accounts::{self, AccountError};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::UserProfile;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub profile: UserProfile,
}

fn issue_session(ctx: &ApiContext, profile: UserProfile) -> Result<SessionResponse, ApiError> {
    let token = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?
        .issue(profile.user_id);
    Ok(SessionResponse { token, profile })
}

/// Run password hashing on the blocking pool, away from the database lock.
async fn off_runtime<T: Send + 'static>(
    work: impl FnOnce() -> Result<T, AccountError> + Send + 'static,
) -> Result<Result<T, AccountError>, ApiError> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("password task failed: {e}")))
}

/// `POST /api/auth/register`: create an account and sign it in.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let RegisterRequest { email, password, name } = req;
    let account = off_runtime(move || accounts::prepare_registration(&email, &password, &name, Utc::now())).await??;
    let profile = ctx.core.with_conn(|conn| accounts::store_registration(conn, account))?;
    Ok((StatusCode::CREATED, Json(issue_session(&ctx, profile)?)))
}

/// `POST /api/auth/login`: exchange credentials for a token.
///
/// Repeated failures for one email lock that email out for a while.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let key = req.email.trim().to_lowercase();

    {
        let mut lockout = ctx
            .login_lockout
            .lock()
            .map_err(|_| ApiError::Internal("lockout lock".into()))?;
        if let Some(retry_after) = lockout.locked_for(&key) {
            return Err(ApiError::LoginLocked { retry_after });
        }
    }

    let creds = ctx.core.with_conn(|conn| accounts::lookup_credentials(conn, &req.email))?;
    let password = req.password;
    let verified = off_runtime(move || accounts::verify_password(creds.as_ref(), &password)).await?;
    let result = verified.and_then(|user_id| ctx.core.with_conn(|conn| accounts::get_profile(conn, &user_id)));

    let mut lockout = ctx
        .login_lockout
        .lock()
        .map_err(|_| ApiError::Internal("lockout lock".into()))?;
    match result {
        Ok(profile) => {
            lockout.clear(&key);
            drop(lockout);
            tracing::info!(user = %profile.user_id, "Login succeeded");
            Ok(Json(issue_session(&ctx, profile)?))
        }
        Err(AccountError::InvalidCredentials) => {
            lockout.record_failure(&key);
            Err(ApiError::Unauthorized)
        }
        Err(other) => Err(other.into()),
    }
}

/// `POST /api/auth/logout`: revoke the calling token. Reminders stop once
/// the user's last session is gone.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<StatusCode, ApiError> {
    let signed_out = {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.revoke(&user.token_hash);
        !sessions.has_user(&user.user_id)
    };
    // Other devices still signed in keep their reminders
    if signed_out {
        ctx.core.reminders.cancel(&user.user_id);
    }
    tracing::info!(user = %user.user_id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}
