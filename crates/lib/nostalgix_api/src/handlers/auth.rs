//! Authentication request handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use nostalgix_core::models::auth::{AuthTokens, User};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{
    AnonymousLoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, TokenResponse,
    UsernameRequest,
};

/// Wrap a token pair with access-token metadata.
fn token_response(state: &AppState, tokens: AuthTokens) -> TokenResponse {
    TokenResponse {
        tokens,
        expires_in: state.auth.issuer().access_ttl().num_seconds(),
        token_type: "Bearer".to_string(),
    }
}

/// `POST /v1/auth/login/username` — authenticate with username + password.
pub async fn login_username_handler(
    State(state): State<AppState>,
    payload: Result<Json<UsernameRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(body) = payload?;
    let tokens = state
        .auth
        .login_username(&body.username, &body.password, body.device_key.as_deref())
        .await?;
    Ok(Json(token_response(&state, tokens)))
}

/// `POST /v1/auth/register` — create a password account and log it in.
pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<UsernameRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(body) = payload?;
    let tokens = state
        .auth
        .register_username(&body.username, &body.password, body.device_key.as_deref())
        .await?;
    Ok(Json(token_response(&state, tokens)))
}

/// `POST /v1/auth/login/anonymous` — log in the account bound to a device key.
pub async fn login_anonymous_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnonymousLoginRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(body) = payload?;
    let tokens = state.auth.login_anonymous(&body.device_key).await?;
    Ok(Json(token_response(&state, tokens)))
}

/// `POST /v1/auth/refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(body) = payload?;
    let tokens = state
        .auth
        .refresh(&body.refresh_token, &body.device_key)
        .await?;
    Ok(Json(token_response(&state, tokens)))
}

/// `GET /v1/auth/user` — profile of the authenticated caller.
pub async fn current_user_handler(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<User>> {
    Ok(Json(user))
}

/// `POST /v1/auth/logout` — revoke the caller's session on one device.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> AppResult<Json<LogoutResponse>> {
    let Json(body) = payload?;
    state.auth.logout(&user.id, &body.device_key).await?;
    Ok(Json(LogoutResponse { success: true }))
}
