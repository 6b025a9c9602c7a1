//! Integration tests for the PostgreSQL credential store.
//!
//! Run against the database named by `DATABASE_URL`; skipped when it is unset.

use std::sync::Arc;

use chrono::Duration;
use nostalgix_core::auth::AuthError;
use nostalgix_core::auth::identity::{resolve_anonymous, resolve_by_user_id};
use nostalgix_core::auth::jwt::TokenIssuer;
use nostalgix_core::auth::service::AuthService;
use nostalgix_core::auth::session::{default_refresh_ttl, invalidate, renew, rotate, validate};
use nostalgix_core::auth::store::{CredentialStore, PgCredentialStore};
use nostalgix_core::migrate::migrate;
use nostalgix_core::models::auth::UserRecord;
use nostalgix_core::uuid::uuidv4;
use sqlx::PgPool;

async fn store() -> Option<PgCredentialStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL store test");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect to PG");
    migrate(&pool).await.expect("run migrations");
    Some(PgCredentialStore::new(pool))
}

fn issuer() -> TokenIssuer {
    TokenIssuer::new(b"pg-store-secret", Duration::minutes(15)).expect("issuer")
}

/// Device keys are unique per test run so runs never see each other's rows.
fn device() -> String {
    format!("dev-{}", uuidv4())
}

async fn live_rows(pool: &PgPool, user_id: &str, device_key: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT count(*) FROM refresh_tokens \
         WHERE user_id = $1::uuid AND device_key = $2 \
           AND revoked_at IS NULL AND expires_at > now()",
    )
    .bind(user_id)
    .bind(device_key)
    .fetch_one(pool)
    .await
    .expect("count live rows")
}

#[tokio::test]
async fn rotation_keeps_one_live_row_per_device() {
    let Some(store) = store().await else { return };
    let issuer = issuer();
    let ttl = default_refresh_ttl();
    let device_key = device();
    let user = resolve_anonymous(&store, &device_key).await.expect("provision");

    let first = rotate(&store, &issuer, ttl, &device_key, &user.id).await.expect("rotate");
    let second = rotate(&store, &issuer, ttl, &device_key, &user.id).await.expect("rotate");

    assert_eq!(live_rows(store.pool(), &user.id, &device_key).await, 1);
    assert!(matches!(
        validate(&store, &issuer, &device_key, &first).await,
        Err(AuthError::InvalidRefreshToken)
    ));
    let owner = validate(&store, &issuer, &device_key, &second).await.expect("validate");
    assert_eq!(owner, user.id);
}

#[tokio::test]
async fn renewal_redeems_a_token_once() {
    let Some(store) = store().await else { return };
    let issuer = issuer();
    let ttl = default_refresh_ttl();
    let device_key = device();
    let user = resolve_anonymous(&store, &device_key).await.expect("provision");

    let first = rotate(&store, &issuer, ttl, &device_key, &user.id).await.expect("rotate");
    let second = renew(&store, &issuer, ttl, &device_key, &user.id, &first)
        .await
        .expect("renew");
    let err = renew(&store, &issuer, ttl, &device_key, &user.id, &first)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRefreshToken));

    // The rejected renewal rolled back; the winner is still the live session.
    assert_eq!(live_rows(store.pool(), &user.id, &device_key).await, 1);
    validate(&store, &issuer, &device_key, &second).await.expect("validate");
}

#[tokio::test]
async fn concurrent_refreshes_have_one_winner() {
    let Some(store) = store().await else { return };
    let svc = AuthService::new(Arc::new(store.clone()), issuer());
    let device_key = device();

    let tokens = svc.login_anonymous(&device_key).await.expect("login");
    let raw = tokens.refresh_token.clone().expect("refresh token");
    let user = svc.authenticate(&tokens.access_token).await.expect("authenticate");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let svc = svc.clone();
        let raw = raw.clone();
        let device_key = device_key.clone();
        handles.push(tokio::spawn(async move { svc.refresh(&raw, &device_key).await }));
    }
    let mut redeemed = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => redeemed += 1,
            Err(e) => assert!(matches!(e, AuthError::InvalidRefreshToken), "unexpected: {e}"),
        }
    }

    assert_eq!(redeemed, 1);
    assert_eq!(live_rows(store.pool(), &user.id, &device_key).await, 1);
}

#[tokio::test]
async fn invalidate_revokes_and_is_idempotent() {
    let Some(store) = store().await else { return };
    let issuer = issuer();
    let device_key = device();
    let user = resolve_anonymous(&store, &device_key).await.expect("provision");
    let raw = rotate(&store, &issuer, default_refresh_ttl(), &device_key, &user.id)
        .await
        .expect("rotate");

    invalidate(&store, &user.id, &device_key).await.expect("invalidate");
    invalidate(&store, &user.id, &device_key).await.expect("invalidate again");

    assert_eq!(live_rows(store.pool(), &user.id, &device_key).await, 0);
    assert!(validate(&store, &issuer, &device_key, &raw).await.is_err());
}

#[tokio::test]
async fn duplicate_live_identity_writes_no_rows() {
    let Some(store) = store().await else { return };
    let device_key = device();
    let user = resolve_anonymous(&store, &device_key).await.expect("provision");

    let twin = UserRecord {
        id: uuidv4().to_string(),
        name: "Twin".into(),
        customer_id: uuidv4().to_string(),
        auth_method: "anonymous".into(),
        auth_id: device_key.clone(),
        password_hash: None,
        is_new_user: true,
        credits: 3,
        credits_expires_at: None,
        subscription_plan: None,
        subscription_type: None,
        subscription_period: None,
        subscription_status: None,
        subscription_expires_at: None,
        fcm_token: None,
        deleted_at: None,
    };
    assert_eq!(store.insert_user(&twin).await.expect("insert"), 0);

    let found = store
        .get_user_by_device_key(&device_key)
        .await
        .expect("lookup")
        .expect("live user");
    assert_eq!(found.id, user.id);
}

#[tokio::test]
async fn soft_deleted_user_frees_its_identity() {
    let Some(store) = store().await else { return };
    let device_key = device();
    let first = resolve_anonymous(&store, &device_key).await.expect("provision");

    sqlx::query("UPDATE users SET deleted_at = now() WHERE id = $1::uuid")
        .bind(&first.id)
        .execute(store.pool())
        .await
        .expect("soft delete");

    assert!(resolve_by_user_id(&store, &first.id).await.expect("lookup").is_none());
    let second = resolve_anonymous(&store, &device_key).await.expect("reprovision");
    assert_ne!(first.id, second.id);
    assert_eq!(second.credits, 3);
}

#[tokio::test]
async fn expired_session_is_not_valid() {
    let Some(store) = store().await else { return };
    let issuer = issuer();
    let device_key = device();
    let user = resolve_anonymous(&store, &device_key).await.expect("provision");

    let raw = rotate(&store, &issuer, Duration::seconds(-1), &device_key, &user.id)
        .await
        .expect("rotate");
    assert!(matches!(
        validate(&store, &issuer, &device_key, &raw).await,
        Err(AuthError::InvalidRefreshToken)
    ));
}
