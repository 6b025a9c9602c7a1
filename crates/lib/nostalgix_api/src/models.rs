//! Request and response bodies.

use nostalgix_core::models::auth::AuthTokens;
use serde::{Deserialize, Serialize};

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `POST /v1/auth/login/username` and `POST /v1/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct UsernameRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Opt into a rotating refresh session scoped to this device.
    #[serde(default)]
    pub device_key: Option<String>,
}

/// `POST /v1/auth/login/anonymous`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnonymousLoginRequest {
    #[serde(default)]
    pub device_key: String,
}

/// `POST /v1/auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub device_key: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// `POST /v1/auth/logout`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub device_key: String,
}

/// Token pair plus access-token metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub tokens: AuthTokens,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
