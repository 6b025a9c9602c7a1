//! Auth-related database queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use crate::models::auth::{AuthMethod, UserRecord};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str = "id::text AS id, name, customer_id::text AS customer_id, \
     auth_method, auth_id, password_hash, is_new_user, credits, credits_expires_at, \
     subscription_plan, subscription_type, subscription_period, subscription_status, \
     subscription_expires_at, fcm_token, deleted_at";

/// Fetch a live user by `(auth_method, auth_id)`.
pub async fn find_user_by_auth_id(
    pool: &PgPool,
    method: AuthMethod,
    auth_id: &str,
) -> Result<Option<UserRecord>, AuthError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE auth_method = $1 AND auth_id = $2 AND deleted_at IS NULL"
    );
    let row = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(method.as_str())
        .bind(auth_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Fetch a live user by ID.
pub async fn get_user_by_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<UserRecord>, AuthError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE id = $1::uuid AND deleted_at IS NULL"
    );
    let row = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert a user, returning the number of rows written.
///
/// A live user with the same `(auth_method, auth_id)` makes this a no-op (0 rows).
pub async fn insert_user(pool: &PgPool, user: &UserRecord) -> Result<u64, AuthError> {
    let result = sqlx::query(
        "INSERT INTO users \
           (id, name, customer_id, auth_method, auth_id, password_hash, is_new_user, credits) \
         VALUES ($1::uuid, $2, $3::uuid, $4, $5, $6, $7, $8) \
         ON CONFLICT (auth_method, auth_id) WHERE deleted_at IS NULL DO NOTHING",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.customer_id)
    .bind(&user.auth_method)
    .bind(&user.auth_id)
    .bind(&user.password_hash)
    .bind(user.is_new_user)
    .bind(user.credits)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Revoke every live session for `(user_id, device_key)` and store a new
/// token hash, in one transaction.
///
/// A transaction-scoped advisory lock on the pair serializes concurrent
/// rotations; the partial unique index on non-revoked rows backs it up.
/// When `previous_hash` is given it must still name the pair's valid
/// session, so each refresh token is redeemed at most once.
pub async fn rotate_refresh_token(
    pool: &PgPool,
    device_key: &str,
    user_id: &str,
    previous_hash: Option<&str>,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AuthError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("{user_id}:{device_key}"))
        .execute(&mut *tx)
        .await?;

    if let Some(previous_hash) = previous_hash {
        let redeemed = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE device_key = $1 AND user_id = $2::uuid AND token_hash = $3 \
               AND revoked_at IS NULL AND expires_at > now()",
        )
        .bind(device_key)
        .bind(user_id)
        .bind(previous_hash)
        .execute(&mut *tx)
        .await?;

        if redeemed.rows_affected() == 0 {
            // Already redeemed by a concurrent refresh; dropping `tx` rolls back.
            return Err(AuthError::InvalidRefreshToken);
        }
    }

    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE device_key = $1 AND user_id = $2::uuid AND revoked_at IS NULL",
    )
    .bind(device_key)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let inserted = sqlx::query(
        "INSERT INTO refresh_tokens (id, device_key, user_id, token_hash, created_at, expires_at) \
         VALUES ($1, $2, $3::uuid, $4, now(), $5)",
    )
    .bind(uuidv7())
    .bind(device_key)
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        // Dropping `tx` rolls back the revocation.
        return Err(AuthError::RowsNotWritten(format!(
            "refresh token for user {user_id}"
        )));
    }

    tx.commit().await?;
    Ok(())
}

/// Find the owner of a valid, non-revoked, non-expired refresh token.
pub async fn find_valid_refresh_token(
    pool: &PgPool,
    device_key: &str,
    token_hash: &str,
) -> Result<Option<String>, AuthError> {
    let row = sqlx::query_scalar::<_, String>(
        "SELECT rt.user_id::text \
         FROM refresh_tokens rt \
         WHERE rt.device_key = $1 \
           AND rt.token_hash = $2 \
           AND rt.revoked_at IS NULL \
           AND rt.expires_at > now()",
    )
    .bind(device_key)
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Revoke all currently valid refresh tokens for a user on one device.
pub async fn revoke_device_refresh_tokens(
    pool: &PgPool,
    user_id: &str,
    device_key: &str,
) -> Result<u64, AuthError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE user_id = $1::uuid AND device_key = $2 \
           AND revoked_at IS NULL AND expires_at > now()",
    )
    .bind(user_id)
    .bind(device_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
