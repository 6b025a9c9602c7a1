//! Integration tests: build the router over an in-memory credential store
//! and drive the auth endpoints end to end.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Duration;
use nostalgix_api::{AppState, router};
use nostalgix_core::auth::jwt::TokenIssuer;
use nostalgix_core::auth::memory::MemoryCredentialStore;
use nostalgix_core::auth::service::AuthService;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let store = Arc::new(MemoryCredentialStore::new());
    let issuer = TokenIssuer::new(b"test-secret", Duration::minutes(15)).expect("issuer");
    router(AppState {
        auth: AuthService::new(store, issuer),
    })
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn str_field<'a>(json: &'a Value, field: &str) -> &'a str {
    json[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing '{field}' in {json}"))
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let app = app();
    let (status, json) = send(&app, get("/healthcheck", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn anonymous_login_refresh_and_replay() {
    let app = app();

    let (status, t1) = send(
        &app,
        post_json("/v1/auth/login/anonymous", json!({ "device_key": "dev-42" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t1["token_type"], "Bearer");
    assert_eq!(t1["expires_in"], 15 * 60);
    let r1 = str_field(&t1, "refresh_token").to_string();

    let (status, user) = send(
        &app,
        get("/v1/auth/user", Some(str_field(&t1, "access_token"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["credits"], 3);
    assert_eq!(user["auth_method"], "anonymous");
    assert!(user.get("auth_id").is_none());
    assert!(user.get("password_hash").is_none());

    let refresh_body = json!({ "device_key": "dev-42", "refresh_token": r1 });
    let (status, t2) = send(&app, post_json("/v1/auth/refresh", refresh_body.clone(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(str_field(&t2, "refresh_token"), r1);

    let (status, err) = send(&app, post_json("/v1/auth/refresh", refresh_body, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "unauthorized");

    let (_, user2) = send(
        &app,
        get("/v1/auth/user", Some(str_field(&t2, "access_token"))),
    )
    .await;
    assert_eq!(user2["id"], user["id"]);
}

#[tokio::test]
async fn missing_device_key_is_bad_request() {
    let app = app();
    let (status, err) = send(&app, post_json("/v1/auth/login/anonymous", json!({}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "validation_error");

    let (status, _) = send(
        &app,
        post_json("/v1/auth/refresh", json!({ "device_key": "dev-1" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/v1/auth/login/anonymous")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, err) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn protected_routes_require_valid_bearer() {
    let app = app();

    let (status, _) = send(&app, get("/v1/auth/user", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/v1/auth/user", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/auth/user")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json("/v1/auth/logout", json!({ "device_key": "dev-1" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_device_session() {
    let app = app();
    let (_, tokens) = send(
        &app,
        post_json("/v1/auth/login/anonymous", json!({ "device_key": "dev-7" }), None),
    )
    .await;
    let access = str_field(&tokens, "access_token").to_string();
    let refresh = str_field(&tokens, "refresh_token").to_string();

    let (status, body) = send(
        &app,
        post_json("/v1/auth/logout", json!({ "device_key": "dev-7" }), Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(
        &app,
        post_json(
            "/v1/auth/refresh",
            json!({ "device_key": "dev-7", "refresh_token": refresh }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_username_login() {
    let app = app();

    let (status, reg) = send(
        &app,
        post_json(
            "/v1/auth/register",
            json!({ "username": "alice", "password": "long-enough" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reg.get("refresh_token").is_none());

    let (status, _) = send(
        &app,
        post_json(
            "/v1/auth/login/username",
            json!({ "username": "alice", "password": "wrong-password" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tokens) = send(
        &app,
        post_json(
            "/v1/auth/login/username",
            json!({ "username": "alice", "password": "long-enough", "device_key": "laptop" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = str_field(&tokens, "refresh_token").to_string();

    let (status, _) = send(
        &app,
        post_json(
            "/v1/auth/refresh",
            json!({ "device_key": "laptop", "refresh_token": refresh }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn short_password_registration_is_bad_request() {
    let app = app();
    let (status, err) = send(
        &app,
        post_json(
            "/v1/auth/register",
            json!({ "username": "bob", "password": "short" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(str_field(&err, "message").contains("at least"));
}
