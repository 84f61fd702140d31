//! Liveness and readiness probes.
//!
//! - `/health`: the process is running
//! - `/ready`: at least one key source has been fetched successfully

use crate::errors::ServiceError;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub key_sources: usize,
}

/// Liveness probe. Checks nothing.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe.
///
/// Returns 503 until some key source has succeeded. Once ready, the service
/// stays ready: later fetch failures keep serving the last good keys.
#[tracing::instrument(skip_all, name = "jwtauth.service.health.readiness")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, ServiceError> {
    if !state.registry.has_any_success() {
        return Err(ServiceError::ServiceUnavailable(
            "no key source has been fetched yet".to_string(),
        ));
    }

    Ok(Json(ReadinessResponse {
        status: "ready",
        key_sources: state.registry.source_count(),
    }))
}
