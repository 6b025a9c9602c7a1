//! Authentication and session logic.
//!
//! Identity resolution, access-token issuance and the device-scoped
//! refresh-token rotation protocol. Durable state lives behind
//! [`store::CredentialStore`]; [`service::AuthService`] composes the pieces
//! into the public login / refresh / logout operations.

pub mod identity;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod service;
pub mod session;
pub mod store;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Invalid or expired token")]
    InvalidAccessToken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("No rows written: {0}")]
    RowsNotWritten(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the caller must start over with a fresh login.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::CredentialError
                | AuthError::InvalidRefreshToken
                | AuthError::InvalidAccessToken
        )
    }
}
