//! Prometheus recorder and adapter-level metrics.
//!
//! The key registry and verifier record through the `metrics` facade in the
//! `jwtauth` crate; this module installs the exporter that serves them.
//!
//! # Cardinality
//!
//! - `stage`: 2 values (bearer, verify)

use metrics::counter;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus recorder and return the handle for `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Fetches are bounded by the configured timeout (default 5s)
        .set_buckets_for_metric(
            Matcher::Full("jwtauth_key_fetch_duration_seconds".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set key fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Count a request rejected by an adapter.
///
/// `stage` is `bearer` for header problems and `verify` for verifier
/// rejections.
pub fn record_auth_rejection(stage: &'static str) {
    counter!("jwtauth_auth_rejections_total", "stage" => stage).increment(1);
}
