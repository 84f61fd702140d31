//! Published key set.

use crate::routes::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

/// `GET /.well-known/jwks.json`
///
/// Serves the registry's merged document as last rebuilt, with the
/// configured `max-age`.
pub async fn published_key_set(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CACHE_CONTROL,
                format!("max-age={}", state.config.publish_max_age_seconds),
            ),
        ],
        state.registry.serialized_key_set(),
    )
}
