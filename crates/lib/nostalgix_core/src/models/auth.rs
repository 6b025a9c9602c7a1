//! Authentication domain models.
//!
//! `UserRecord` mirrors a row of the `users` table. `User` is the projection
//! handed to callers: effective credits, effective subscription, no secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credits granted to a freshly provisioned account.
pub const STARTER_CREDITS: i32 = 3;

/// How a user authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Anonymous,
    Password,
    Google,
    Apple,
}

impl AuthMethod {
    /// Value stored in `users.auth_method`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Anonymous => "anonymous",
            AuthMethod::Password => "password",
            AuthMethod::Google => "google",
            AuthMethod::Apple => "apple",
        }
    }
}

/// Subscription status as stored in `users.subscription_status`.
pub mod subscription_status {
    pub const ACTIVE: &str = "active";
}

/// A stored user row, including fields never exposed to clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub customer_id: String,
    pub auth_method: String,
    pub auth_id: String,
    pub password_hash: Option<String>,
    pub is_new_user: bool,
    pub credits: i32,
    pub credits_expires_at: Option<DateTime<Utc>>,
    pub subscription_plan: Option<String>,
    pub subscription_type: Option<String>,
    pub subscription_period: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub fcm_token: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Credits visible at `now`: the stored balance until it expires, zero afterwards.
    pub fn effective_credits(&self, now: DateTime<Utc>) -> i32 {
        match self.credits_expires_at {
            Some(expires_at) if expires_at <= now => 0,
            _ => self.credits,
        }
    }

    /// Subscription visible at `now`, if it is active, unexpired and fully populated.
    pub fn effective_subscription(&self, now: DateTime<Utc>) -> Option<Subscription> {
        if self.subscription_status.as_deref() != Some(subscription_status::ACTIVE) {
            return None;
        }
        if matches!(self.subscription_expires_at, Some(expires_at) if expires_at <= now) {
            return None;
        }
        Some(Subscription {
            plan: self.subscription_plan.clone()?,
            kind: self.subscription_type.clone()?,
            period: self.subscription_period.clone()?,
            status: self.subscription_status.clone()?,
        })
    }

    /// Project the row into the caller-facing profile as of `now`.
    pub fn to_user(&self, now: DateTime<Utc>) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            credits: self.effective_credits(now),
            subscription: self.effective_subscription(now),
            auth_method: self.auth_method.clone(),
            is_new_user: self.is_new_user,
            customer_id: self.customer_id.clone(),
        }
    }
}

/// Caller-facing user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub credits: i32,
    pub subscription: Option<Subscription>,
    pub auth_method: String,
    pub is_new_user: bool,
    pub customer_id: String,
}

/// An effective subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub period: String,
    pub status: String,
}

/// Refresh token record stored in the database.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub device_key: String,
    pub user_id: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Not revoked and not yet expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Token pair returned after a login or rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    /// Absent for stateless username sessions opened without a device key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}
