//! Authentication facade: login, refresh and logout flows.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use super::jwt::TokenIssuer;
use super::store::CredentialStore;
use super::{AuthError, identity, session};
use crate::models::auth::{AuthTokens, User};

/// Reject empty required fields before anything touches the store.
fn require(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}

fn require_optional(value: Option<&str>, field: &str) -> Result<(), AuthError> {
    match value {
        Some(v) => require(v, field),
        None => Ok(()),
    }
}

/// Composes identity resolution, token issuance and session rotation.
///
/// Cheap to clone; all clones share one store and one issuer.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: TokenIssuer) -> Self {
        Self {
            store,
            issuer,
            refresh_ttl: session::default_refresh_ttl(),
        }
    }

    /// Override the refresh token lifetime (default 7 days).
    pub fn with_refresh_ttl(mut self, refresh_ttl: Duration) -> Self {
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Issue an access token and, when a device is given, a rotated refresh token.
    async fn issue_tokens(
        &self,
        user: &User,
        device_key: Option<&str>,
    ) -> Result<AuthTokens, AuthError> {
        let access_token = self.issuer.issue_access_token(user)?;
        let refresh_token = match device_key {
            Some(device_key) => Some(
                session::rotate(
                    self.store.as_ref(),
                    &self.issuer,
                    self.refresh_ttl,
                    device_key,
                    &user.id,
                )
                .await?,
            ),
            None => None,
        };
        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    /// Authenticate with username + password.
    ///
    /// With a device key the session joins the rotation protocol; without one
    /// only an access token is issued.
    pub async fn login_username(
        &self,
        username: &str,
        password: &str,
        device_key: Option<&str>,
    ) -> Result<AuthTokens, AuthError> {
        require(username, "Username")?;
        require(password, "Password")?;
        require_optional(device_key, "Device key")?;

        let user = identity::resolve_by_credentials(self.store.as_ref(), username, password).await?;
        info!(user_id = %user.id, stateful = device_key.is_some(), "username login");
        self.issue_tokens(&user, device_key).await
    }

    /// Create a password account, then log it in.
    pub async fn register_username(
        &self,
        username: &str,
        password: &str,
        device_key: Option<&str>,
    ) -> Result<AuthTokens, AuthError> {
        require(username, "Username")?;
        require(password, "Password")?;
        require_optional(device_key, "Device key")?;

        let user = identity::register_credentials(self.store.as_ref(), username, password).await?;
        self.issue_tokens(&user, device_key).await
    }

    /// Log in the anonymous account bound to `device_key`, creating it on first use.
    pub async fn login_anonymous(&self, device_key: &str) -> Result<AuthTokens, AuthError> {
        require(device_key, "Device key")?;

        let user = identity::resolve_anonymous(self.store.as_ref(), device_key).await?;
        info!(user_id = %user.id, device_key, "anonymous login");
        self.issue_tokens(&user, Some(device_key)).await
    }

    /// Exchange a refresh token for a new pair. The presented token is revoked.
    ///
    /// Each refresh token is redeemed at most once, even under concurrent use.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device_key: &str,
    ) -> Result<AuthTokens, AuthError> {
        require(device_key, "Device key")?;
        require(refresh_token, "Refresh token")?;

        let user_id =
            session::validate(self.store.as_ref(), &self.issuer, device_key, refresh_token).await?;

        let user = identity::resolve_by_user_id(self.store.as_ref(), &user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        debug!(user_id = %user.id, device_key, "refreshing session");
        let access_token = self.issuer.issue_access_token(&user)?;
        let refresh_token = session::renew(
            self.store.as_ref(),
            &self.issuer,
            self.refresh_ttl,
            device_key,
            &user.id,
            refresh_token,
        )
        .await?;
        Ok(AuthTokens {
            access_token,
            refresh_token: Some(refresh_token),
        })
    }

    /// Revoke the sessions of `user_id` on `device_key`.
    pub async fn logout(&self, user_id: &str, device_key: &str) -> Result<(), AuthError> {
        require(device_key, "Device key")?;

        session::invalidate(self.store.as_ref(), user_id, device_key).await?;
        info!(user_id, device_key, "logout");
        Ok(())
    }

    /// Verify an access token and load the live user it names.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self
            .issuer
            .verify_access_token(access_token)
            .ok_or(AuthError::InvalidAccessToken)?;

        identity::resolve_by_user_id(self.store.as_ref(), &claims.id)
            .await?
            .ok_or(AuthError::InvalidAccessToken)
    }
}
