//! Metrics recorded by the key registry and the verifier.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! # Cardinality
//!
//! - `status`: `success`, `error`
//! - `outcome`: `accepted` plus one value per [`crate::AuthError::reason_code`]
//!
//! Endpoint URLs are deliberately not used as labels.

use crate::error::AuthError;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Key Fetch Metrics
// ============================================================================

/// Record one JWKS fetch cycle.
///
/// Metric: `jwtauth_key_fetch_total`, `jwtauth_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &str, duration: Duration) {
    counter!("jwtauth_key_fetch_total", "status" => status.to_string()).increment(1);
    histogram!("jwtauth_key_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());
}

/// Set the number of keys in the registry's merged view.
///
/// Metric: `jwtauth_registry_keys`
#[allow(clippy::cast_precision_loss)]
pub fn set_registry_keys(count: usize) {
    gauge!("jwtauth_registry_keys").set(count as f64);
}

// ============================================================================
// Verification Metrics
// ============================================================================

/// Record the outcome of one verification call.
///
/// Metric: `jwtauth_token_verifications_total`
/// Labels: `outcome`
pub fn record_verification(result: Result<(), &AuthError>) {
    let outcome = match result {
        Ok(()) => "accepted",
        Err(e) => e.reason_code(),
    };
    counter!("jwtauth_token_verifications_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn label(key: &metrics_util::CompositeKey, name: &str) -> Option<String> {
        key.key()
            .labels()
            .find(|l| l.key() == name)
            .map(|l| l.value().to_string())
    }

    #[test]
    fn test_record_key_fetch() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_key_fetch("success", Duration::from_millis(12));
            record_key_fetch("error", Duration::from_millis(5000));
            record_key_fetch("error", Duration::from_millis(5000));
        });

        let mut counters = Vec::new();
        let mut histograms = Vec::new();
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            let status = label(&key, "status").expect("status label");
            match value {
                DebugValue::Counter(n) => {
                    assert_eq!(key.key().name(), "jwtauth_key_fetch_total");
                    counters.push((status, n));
                }
                DebugValue::Histogram(samples) => {
                    assert_eq!(key.key().name(), "jwtauth_key_fetch_duration_seconds");
                    histograms.push((status, samples.len()));
                }
                DebugValue::Gauge(_) => panic!("unexpected gauge"),
            }
        }

        assert!(counters.contains(&("success".to_string(), 1)));
        assert!(counters.contains(&("error".to_string(), 2)));
        assert!(histograms.contains(&("success".to_string(), 1)));
        assert!(histograms.contains(&("error".to_string(), 2)));
    }

    #[test]
    fn test_set_registry_keys() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            set_registry_keys(0);
            set_registry_keys(3);
        });

        let gauges: Vec<f64> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Gauge(v) if key.key().name() == "jwtauth_registry_keys" => {
                    Some(v.into_inner())
                }
                _ => None,
            })
            .collect();

        assert_eq!(gauges, vec![3.0]);
    }

    #[test]
    fn test_verification_outcome_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_verification(Ok(()));
            record_verification(Err(&AuthError::ExpiredToken));
            record_verification(Err(&AuthError::ExpiredToken));
        });

        let counters: Vec<(String, u64)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(n) => Some((label(&key, "outcome")?, n)),
                _ => None,
            })
            .collect();

        assert!(counters.contains(&("accepted".to_string(), 1)));
        assert!(counters.contains(&("expired_token".to_string(), 2)));
    }
}
