//! Credential store contract.
//!
//! The auth core reads and writes all durable state through
//! [`CredentialStore`]. [`PgCredentialStore`] is the production
//! implementation; [`super::memory::MemoryCredentialStore`] keeps the same
//! semantics in process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use super::queries;
use crate::models::auth::{AuthMethod, UserRecord};

/// Repository for user profiles and refresh-token records.
///
/// Lookups never return soft-deleted users. Implementations must make
/// [`create_rotated_refresh_token`](Self::create_rotated_refresh_token)
/// all-or-nothing and isolated per `(device_key, user_id)`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Live anonymous user whose auth identifier is `device_key`.
    async fn get_user_by_device_key(
        &self,
        device_key: &str,
    ) -> Result<Option<UserRecord>, AuthError>;

    /// Live password user whose auth identifier is `username`.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Live user by ID.
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Insert a new user, returning the number of rows written.
    async fn insert_user(&self, user: &UserRecord) -> Result<u64, AuthError>;

    /// Revoke all non-revoked tokens for the pair and insert `token_hash` as
    /// the single live session.
    ///
    /// With `previous_hash`, the rotation only happens if that token is still
    /// the pair's valid session; otherwise nothing is written and the call
    /// fails with [`AuthError::InvalidRefreshToken`].
    async fn create_rotated_refresh_token(
        &self,
        device_key: &str,
        user_id: &str,
        previous_hash: Option<&str>,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Owner of the valid token matching `(device_key, token_hash)`, if any.
    async fn validate_refresh_token(
        &self,
        device_key: &str,
        token_hash: &str,
    ) -> Result<Option<String>, AuthError>;

    /// Revoke every valid token for the pair. Revoking nothing is not an error.
    async fn invalidate_refresh_token(
        &self,
        user_id: &str,
        device_key: &str,
    ) -> Result<(), AuthError>;
}

/// PostgreSQL-backed credential store.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get_user_by_device_key(
        &self,
        device_key: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        queries::find_user_by_auth_id(&self.pool, AuthMethod::Anonymous, device_key).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        queries::find_user_by_auth_id(&self.pool, AuthMethod::Password, username).await
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AuthError> {
        queries::get_user_by_id(&self.pool, user_id).await
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<u64, AuthError> {
        queries::insert_user(&self.pool, user).await
    }

    async fn create_rotated_refresh_token(
        &self,
        device_key: &str,
        user_id: &str,
        previous_hash: Option<&str>,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        queries::rotate_refresh_token(
            &self.pool,
            device_key,
            user_id,
            previous_hash,
            token_hash,
            expires_at,
        )
        .await
    }

    async fn validate_refresh_token(
        &self,
        device_key: &str,
        token_hash: &str,
    ) -> Result<Option<String>, AuthError> {
        queries::find_valid_refresh_token(&self.pool, device_key, token_hash).await
    }

    async fn invalidate_refresh_token(
        &self,
        user_id: &str,
        device_key: &str,
    ) -> Result<(), AuthError> {
        queries::revoke_device_refresh_tokens(&self.pool, user_id, device_key).await?;
        Ok(())
    }
}
