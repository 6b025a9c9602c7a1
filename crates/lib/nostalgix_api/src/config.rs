//! API server configuration.

use chrono::Duration;
use nostalgix_core::auth::AuthError;
use nostalgix_core::auth::jwt::TokenIssuer;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Dedicated key for refresh-token hashing; falls back to `jwt_secret`.
    pub refresh_token_secret: Option<String>,
    /// Access token lifetime in minutes.
    pub jwt_expiration_minutes: i64,
}

impl ApiConfig {
    /// Build the token issuer described by this configuration.
    pub fn token_issuer(&self) -> Result<TokenIssuer, AuthError> {
        let issuer = TokenIssuer::new(
            self.jwt_secret.as_bytes(),
            Duration::minutes(self.jwt_expiration_minutes),
        )?;
        match self.refresh_token_secret.as_deref() {
            Some(secret) if !secret.is_empty() => issuer.with_hash_secret(secret.as_bytes()),
            _ => Ok(issuer),
        }
    }
}
