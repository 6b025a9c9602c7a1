//! Identity resolution: device keys and credentials to users.

use chrono::Utc;
use tracing::{debug, error, info};

use super::AuthError;
use super::password::{MIN_PASSWORD_LEN, hash_password, verify_password};
use super::store::CredentialStore;
use crate::models::auth::{AuthMethod, STARTER_CREDITS, User, UserRecord};
use crate::uuid::uuidv4;

/// Build a fresh user row with a new id, customer id and time-derived display name.
fn new_user_record(
    method: AuthMethod,
    auth_id: &str,
    password_hash: Option<String>,
) -> UserRecord {
    UserRecord {
        id: uuidv4().to_string(),
        name: format!("User{}", Utc::now().timestamp()),
        customer_id: uuidv4().to_string(),
        auth_method: method.as_str().to_string(),
        auth_id: auth_id.to_string(),
        password_hash,
        is_new_user: true,
        credits: STARTER_CREDITS,
        credits_expires_at: None,
        subscription_plan: None,
        subscription_type: None,
        subscription_period: None,
        subscription_status: None,
        subscription_expires_at: None,
        fcm_token: None,
        deleted_at: None,
    }
}

/// Persist `record`. `None` when the store wrote no rows, which happens when a
/// live user already holds the same `(auth_method, auth_id)`.
async fn insert_new_user(
    store: &dyn CredentialStore,
    record: UserRecord,
) -> Result<Option<User>, AuthError> {
    let written = store.insert_user(&record).await?;
    if written == 0 {
        return Ok(None);
    }
    Ok(Some(record.to_user(Utc::now())))
}

/// Find the anonymous user bound to `device_key`, provisioning one on first sight.
pub async fn resolve_anonymous(
    store: &dyn CredentialStore,
    device_key: &str,
) -> Result<User, AuthError> {
    if let Some(record) = store.get_user_by_device_key(device_key).await? {
        debug!(user_id = %record.id, "resolved anonymous user");
        return Ok(record.to_user(Utc::now()));
    }

    let record = new_user_record(AuthMethod::Anonymous, device_key, None);
    let Some(user) = insert_new_user(store, record).await? else {
        error!(device_key, "anonymous user insert wrote no rows");
        return Err(AuthError::RowsNotWritten("no anonymous user added".into()));
    };
    info!(user_id = %user.id, "provisioned anonymous user");
    Ok(user)
}

/// Verify `username` / `password` against the stored bcrypt hash.
///
/// Unknown users, users without a password and wrong passwords are
/// indistinguishable to the caller.
pub async fn resolve_by_credentials(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let record = store
        .get_user_by_username(username)
        .await?
        .ok_or(AuthError::CredentialError)?;

    let hash = record
        .password_hash
        .as_deref()
        .ok_or(AuthError::CredentialError)?;

    if !verify_password(password, hash)? {
        return Err(AuthError::CredentialError);
    }

    Ok(record.to_user(Utc::now()))
}

/// Create a password account for `username`.
pub async fn register_credentials(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if store.get_user_by_username(username).await?.is_some() {
        return Err(AuthError::ValidationError("Username already registered".into()));
    }

    let pw_hash = hash_password(password)?;
    let record = new_user_record(AuthMethod::Password, username, Some(pw_hash));
    // A concurrent registration can take the name between the check and the insert.
    let Some(user) = insert_new_user(store, record).await? else {
        return Err(AuthError::ValidationError("Username already registered".into()));
    };
    info!(user_id = %user.id, "registered password user");
    Ok(user)
}

/// Current projected profile for `user_id`, if the user is still live.
pub async fn resolve_by_user_id(
    store: &dyn CredentialStore,
    user_id: &str,
) -> Result<Option<User>, AuthError> {
    Ok(store
        .get_user_by_id(user_id)
        .await?
        .map(|record| record.to_user(Utc::now())))
}
