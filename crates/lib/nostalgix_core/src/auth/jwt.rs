//! Access-token signing and refresh-token hashing.

use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::Sha256;
use tracing::info;

use super::AuthError;
use crate::models::auth::{TokenClaims, User};

type HmacSha256 = Hmac<Sha256>;

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Length of a generated opaque refresh token.
const OPAQUE_TOKEN_LEN: usize = 64;

/// Signs access tokens and hashes refresh tokens with server-held secrets.
///
/// Built once from configuration and shared read-only across requests.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    hash_key: Vec<u8>,
    access_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer signing HS256 tokens with `signing_secret`.
    ///
    /// The same secret keys the refresh-token hash unless
    /// [`with_hash_secret`](Self::with_hash_secret) overrides it.
    pub fn new(signing_secret: &[u8], access_ttl: Duration) -> Result<Self, AuthError> {
        if signing_secret.is_empty() {
            return Err(AuthError::Signing("signing secret is empty".into()));
        }
        if access_ttl <= Duration::zero() {
            return Err(AuthError::Signing("access token ttl must be positive".into()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_secret),
            decoding_key: DecodingKey::from_secret(signing_secret),
            hash_key: signing_secret.to_vec(),
            access_ttl,
        })
    }

    /// Use a dedicated secret for the refresh-token hash.
    pub fn with_hash_secret(mut self, secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Signing("refresh token secret is empty".into()));
        }
        self.hash_key = secret.to_vec();
        Ok(self)
    }

    /// Lifetime of issued access tokens.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Generate a signed JWT access token carrying `{id, name, exp, iat}`.
    pub fn issue_access_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            id: user.id.clone(),
            name: user.name.clone(),
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
    }

    /// Verify a JWT access token, returning the claims on success.
    pub fn verify_access_token(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .ok()
            .map(|data| data.claims)
    }

    /// Keyed one-way hash (HMAC-SHA-256, hex) of a raw refresh token.
    pub fn hash_token(&self, raw: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.hash_key)
            .map_err(|e| AuthError::Signing(format!("hmac key: {e}")))?;
        mac.update(raw.as_bytes());
        Ok(format!("{:x}", mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

/// Generate a random opaque refresh token (64 alphanumeric chars).
pub fn generate_opaque_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(OPAQUE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nostalgix")
        .join("jwt-secret")
}
