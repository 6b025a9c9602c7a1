//! Liveness probe.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /healthcheck` — report liveness and build version.
pub async fn healthcheck_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: nostalgix_core::version().into(),
    })
}
