//! Audit logging middleware.
//!
//! Logs every API request with user_id, method, path and response
//! status. Runs innermost (after auth has injected `UserContext`).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::UserContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<UserContext>()
        .map(|u| u.user_id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    tracing::info!(
        target: "dosewise::audit",
        %user,
        %method,
        %path,
        status = response.status().as_u16(),
        "API access"
    );

    response
}
