//! HTTP routes for the jwtauth service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_auth, AuthPolicy, AuthState};
use axum::{middleware, routing::get, Router};
use jwtauth::{KeyRegistry, Verifier};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live key registry; the verifier and the published key set read it.
    pub registry: KeyRegistry,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/.well-known/jwks.json` - merged key set of every source - public
/// - `/health` - Liveness probe - public
/// - `/ready` - Readiness probe (any key source fetched) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/v1/whoami` - Verified claims of the caller - requires authentication
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState::new(
        Arc::new(Verifier::new(state.registry.clone())),
        AuthPolicy {
            allow_anonymous: state.config.allow_anonymous,
        },
    ));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/.well-known/jwks.json", get(handlers::published_key_set))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/v1/whoami", get(handlers::whoami))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
