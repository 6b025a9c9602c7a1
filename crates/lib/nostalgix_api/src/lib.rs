//! # nostalgix_api
//!
//! HTTP API library for Nostalgix.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use axum::Router;
use axum::routing::{get, post};
use nostalgix_core::auth::service::AuthService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication facade.
    pub auth: AuthService,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTHCHECK, get(health::healthcheck_handler))
        .route(
            routes::POST_AUTH_LOGIN_USERNAME,
            post(auth::login_username_handler),
        )
        .route(
            routes::POST_AUTH_LOGIN_ANONYMOUS,
            post(auth::login_anonymous_handler),
        )
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_AUTH_USER, get(auth::current_user_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
