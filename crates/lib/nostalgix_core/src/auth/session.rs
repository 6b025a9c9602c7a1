//! Device-scoped refresh sessions: rotation, validation and invalidation.

use chrono::{Duration, Utc};
use tracing::debug;

use super::AuthError;
use super::jwt::{TokenIssuer, generate_opaque_token};
use super::store::CredentialStore;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Default refresh token lifetime.
pub fn default_refresh_ttl() -> Duration {
    Duration::days(REFRESH_TOKEN_TTL_DAYS)
}

/// Replace the session for `(device_key, user_id)` with a fresh one.
///
/// Returns the raw refresh token. Only its hash is stored, so this is the
/// one chance to hand it to the client.
pub async fn rotate(
    store: &dyn CredentialStore,
    issuer: &TokenIssuer,
    refresh_ttl: Duration,
    device_key: &str,
    user_id: &str,
) -> Result<String, AuthError> {
    store_fresh_token(store, issuer, refresh_ttl, device_key, user_id, None).await
}

/// Redeem `presented` for a fresh token on the same session.
///
/// The swap is conditional on `presented` still being the live token, so
/// concurrent redemptions of one token yield a single winner; the others
/// fail with [`AuthError::InvalidRefreshToken`].
pub async fn renew(
    store: &dyn CredentialStore,
    issuer: &TokenIssuer,
    refresh_ttl: Duration,
    device_key: &str,
    user_id: &str,
    presented: &str,
) -> Result<String, AuthError> {
    let previous_hash = issuer.hash_token(presented)?;
    store_fresh_token(
        store,
        issuer,
        refresh_ttl,
        device_key,
        user_id,
        Some(&previous_hash),
    )
    .await
}

async fn store_fresh_token(
    store: &dyn CredentialStore,
    issuer: &TokenIssuer,
    refresh_ttl: Duration,
    device_key: &str,
    user_id: &str,
    previous_hash: Option<&str>,
) -> Result<String, AuthError> {
    let raw = generate_opaque_token();
    let token_hash = issuer.hash_token(&raw)?;
    let expires_at = Utc::now() + refresh_ttl;

    store
        .create_rotated_refresh_token(device_key, user_id, previous_hash, &token_hash, expires_at)
        .await?;

    debug!(user_id, device_key, %expires_at, "rotated refresh session");
    Ok(raw)
}

/// Owner of `raw_token` on `device_key`.
///
/// Unknown, revoked and expired tokens all fail with
/// [`AuthError::InvalidRefreshToken`]. The token stays valid until the next
/// rotation for its session.
pub async fn validate(
    store: &dyn CredentialStore,
    issuer: &TokenIssuer,
    device_key: &str,
    raw_token: &str,
) -> Result<String, AuthError> {
    let token_hash = issuer.hash_token(raw_token)?;
    store
        .validate_refresh_token(device_key, &token_hash)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)
}

/// Revoke every valid session for `(user_id, device_key)`.
pub async fn invalidate(
    store: &dyn CredentialStore,
    user_id: &str,
    device_key: &str,
) -> Result<(), AuthError> {
    store.invalidate_refresh_token(user_id, device_key).await?;
    debug!(user_id, device_key, "invalidated refresh sessions");
    Ok(())
}
