//! In-process credential store.
//!
//! Same contract as the PostgreSQL store, backed by vectors under one async
//! mutex. Every operation holds the lock for its whole duration, which gives
//! rotation the same all-or-nothing, serialized behavior as the database
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::auth::{AuthMethod, RefreshTokenRecord, UserRecord};
use crate::uuid::uuidv7;

#[derive(Debug, Default)]
struct State {
    users: Vec<UserRecord>,
    refresh_tokens: Vec<RefreshTokenRecord>,
}

impl State {
    fn live_user(&self, method: AuthMethod, auth_id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| {
            u.deleted_at.is_none() && u.auth_method == method.as_str() && u.auth_id == auth_id
        })
    }
}

/// Credential store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: Mutex<State>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every refresh-token row, revoked and expired ones included.
    pub async fn refresh_tokens(&self) -> Vec<RefreshTokenRecord> {
        self.state.lock().await.refresh_tokens.clone()
    }

    /// Number of live users.
    pub async fn user_count(&self) -> usize {
        let state = self.state.lock().await;
        state.users.iter().filter(|u| u.deleted_at.is_none()).count()
    }

    /// Set the deletion marker on a user. Returns whether a live user matched.
    pub async fn soft_delete_user(&self, user_id: &str) -> bool {
        let mut state = self.state.lock().await;
        match state
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.deleted_at.is_none())
        {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_user_by_device_key(
        &self,
        device_key: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let state = self.state.lock().await;
        Ok(state.live_user(AuthMethod::Anonymous, device_key).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        let state = self.state.lock().await;
        Ok(state.live_user(AuthMethod::Password, username).cloned())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AuthError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.id == user_id && u.deleted_at.is_none())
            .cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<u64, AuthError> {
        let mut state = self.state.lock().await;
        let conflict = state.users.iter().any(|u| {
            u.id == user.id
                || (u.deleted_at.is_none()
                    && u.auth_method == user.auth_method
                    && u.auth_id == user.auth_id)
        });
        if conflict {
            return Ok(0);
        }
        state.users.push(user.clone());
        Ok(1)
    }

    async fn create_rotated_refresh_token(
        &self,
        device_key: &str,
        user_id: &str,
        previous_hash: Option<&str>,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(previous_hash) = previous_hash {
            let still_live = state.refresh_tokens.iter().any(|t| {
                t.device_key == device_key
                    && t.user_id == user_id
                    && t.token_hash == previous_hash
                    && t.is_valid_at(now)
            });
            if !still_live {
                return Err(AuthError::InvalidRefreshToken);
            }
        }
        for token in state
            .refresh_tokens
            .iter_mut()
            .filter(|t| t.device_key == device_key && t.user_id == user_id)
            .filter(|t| t.revoked_at.is_none())
        {
            token.revoked_at = Some(now);
        }
        state.refresh_tokens.push(RefreshTokenRecord {
            id: uuidv7().to_string(),
            device_key: device_key.to_string(),
            user_id: user_id.to_string(),
            token_hash: token_hash.to_string(),
            created_at: now,
            expires_at,
            revoked_at: None,
        });
        Ok(())
    }

    async fn validate_refresh_token(
        &self,
        device_key: &str,
        token_hash: &str,
    ) -> Result<Option<String>, AuthError> {
        let state = self.state.lock().await;
        let now = Utc::now();
        Ok(state
            .refresh_tokens
            .iter()
            .find(|t| {
                t.device_key == device_key && t.token_hash == token_hash && t.is_valid_at(now)
            })
            .map(|t| t.user_id.clone()))
    }

    async fn invalidate_refresh_token(
        &self,
        user_id: &str,
        device_key: &str,
    ) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for token in state
            .refresh_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.device_key == device_key)
            .filter(|t| t.is_valid_at(now))
        {
            token.revoked_at = Some(now);
        }
        Ok(())
    }
}
