//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use nostalgix_core::models::auth::User;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// The authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT,
/// re-fetches the user and injects [`CurrentUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let user = state.auth.authenticate(token).await.inspect_err(|e| {
        debug!("access token rejected: {e}");
    })?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
