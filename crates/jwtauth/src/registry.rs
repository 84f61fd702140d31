//! Multi-source key registry.
//!
//! A [`KeyRegistry`] merges the snapshots of any number of [`KeyPoller`]s with
//! keys injected directly by the caller, and exposes:
//!
//! - lookup by key identifier ([`KeySource`]),
//! - a cached serialization of the merged set for republishing,
//! - "any source succeeded" / "every source attempted" / "every source
//!   succeeded" waits backed by two [`AnyAllGate`]s.
//!
//! # Lifecycle
//!
//! [`KeyRegistry::new`] registers one attempt child and one success child per
//! source but spawns nothing. [`KeyRegistry::start`] spawns one refresh task
//! per source and returns a [`RegistryHandle`]; shutting the handle down (or
//! dropping it) cancels every task.
//!
//! # Serialized cache
//!
//! The serialized document is rebuilt eagerly: after every successful poll,
//! before that poll's success is signalled, and after every direct-key
//! addition. Rebuilds are serialized under the cache's own lock, so the
//! published document lags a snapshot swap only for the duration of one
//! rebuild. It always parses; before any source has succeeded it is
//! `{"keys":[]}`.

use crate::config::RegistryConfig;
use crate::error::{FetchError, RegistryError};
use crate::gate::{AnyAllGate, GateChild};
use crate::jwk::{Jwk, KeySet, KeySource};
use crate::metrics;
use crate::poller::{KeyPoller, PollObserver};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const EMPTY_KEY_SET: &[u8] = br#"{"keys":[]}"#;

// =============================================================================
// Error Sink
// =============================================================================

/// Receiver for operational fetch failures.
///
/// Fetch failures never reach a verification caller and never stop a poller;
/// this is the only place they surface.
pub trait FetchErrorSink: Send + Sync {
    /// Report a failed fetch cycle for the endpoint `source`.
    fn report(&self, source: &str, error: &FetchError);
}

impl<F> FetchErrorSink for F
where
    F: Fn(&str, &FetchError) + Send + Sync,
{
    fn report(&self, source: &str, error: &FetchError) {
        self(source, error);
    }
}

/// Default sink: logs every failure at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl FetchErrorSink for TracingErrorSink {
    fn report(&self, source: &str, error: &FetchError) {
        warn!(
            target: "jwtauth.registry",
            url = %source,
            error = %error,
            "Failed to load JWKS, keeping previous key set"
        );
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct Shared {
    pollers: Vec<Arc<KeyPoller>>,
    direct_keys: watch::Sender<Vec<Jwk>>,
    serialized: watch::Sender<Bytes>,
    error_sink: Arc<dyn FetchErrorSink>,
}

impl Shared {
    fn merged(&self) -> KeySet {
        let mut keys = Vec::new();
        for snapshot in self.pollers.iter().filter_map(|p| p.snapshot()) {
            keys.extend(snapshot.keys.iter().cloned());
        }
        keys.extend(self.direct_keys.borrow().iter().cloned());
        KeySet::new(keys)
    }

    fn rebuild(&self) {
        self.serialized.send_modify(|document| {
            let merged = self.merged();
            match serde_json::to_vec(&merged) {
                Ok(bytes) => {
                    metrics::set_registry_keys(merged.keys.len());
                    *document = Bytes::from(bytes);
                }
                Err(e) => {
                    warn!(
                        target: "jwtauth.registry",
                        error = %e,
                        "Failed to serialize merged key set, keeping previous document"
                    );
                }
            }
        });
    }
}

impl PollObserver for Shared {
    fn key_set_replaced(&self, _source: &KeyPoller) {
        self.rebuild();
    }

    fn fetch_failed(&self, source: &KeyPoller, error: &FetchError) {
        self.error_sink.report(source.url(), error);
    }
}

impl KeySource for Shared {
    fn get_keys(&self, kid: &str) -> Vec<Jwk> {
        let mut keys = Vec::with_capacity(1);
        for snapshot in self.pollers.iter().filter_map(|p| p.snapshot()) {
            keys.extend(snapshot.matching(kid).cloned());
        }
        keys.extend(
            self.direct_keys
                .borrow()
                .iter()
                .filter(|key| key.kid == kid)
                .cloned(),
        );
        keys
    }
}

// =============================================================================
// Key Registry
// =============================================================================

/// Merged, self-refreshing view over remote JWKS endpoints and direct keys.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct KeyRegistry {
    shared: Arc<Shared>,
    attempts: AnyAllGate,
    successes: AnyAllGate,
    children: Arc<Vec<(GateChild, GateChild)>>,
    min_refresh_interval: Duration,
    started: Arc<AtomicBool>,
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry")
            .field(
                "sources",
                &self.shared.pollers.iter().map(|p| p.url()).collect::<Vec<_>>(),
            )
            .field("direct_keys", &self.shared.direct_keys.borrow().len())
            .field("started", &self.started.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl KeyRegistry {
    /// Create a registry reporting fetch failures through [`TracingErrorSink`].
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Config` for an invalid configuration and
    /// `RegistryError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        Self::with_error_sink(config, TracingErrorSink)
    }

    /// Create a registry reporting fetch failures to `sink`.
    ///
    /// # Errors
    ///
    /// Same as [`KeyRegistry::new`].
    pub fn with_error_sink(
        config: RegistryConfig,
        sink: impl FetchErrorSink + 'static,
    ) -> Result<Self, RegistryError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| RegistryError::HttpClient(e.to_string()))?;

        let pollers: Vec<Arc<KeyPoller>> = config
            .jwks_urls
            .iter()
            .map(|url| Arc::new(KeyPoller::new(url.clone(), client.clone())))
            .collect();

        let attempts = AnyAllGate::new();
        let successes = AnyAllGate::new();
        let children = pollers
            .iter()
            .map(|_| (attempts.register(), successes.register()))
            .collect();

        let (direct_keys, _) = watch::channel(Vec::new());
        let (serialized, _) = watch::channel(Bytes::from_static(EMPTY_KEY_SET));

        info!(
            target: "jwtauth.registry",
            sources = pollers.len(),
            "Key registry created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                pollers,
                direct_keys,
                serialized,
                error_sink: Arc::new(sink),
            }),
            attempts,
            successes,
            children: Arc::new(children),
            min_refresh_interval: config.min_refresh_interval,
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spawn one refresh task per source.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyStarted` on every call after the first,
    /// including calls through clones.
    pub fn start(&self) -> Result<RegistryHandle, RegistryError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RegistryError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();
        let tasks = self
            .shared
            .pollers
            .iter()
            .zip(self.children.iter())
            .map(|(poller, (attempt, success))| {
                let poller = Arc::clone(poller);
                let shared = Arc::clone(&self.shared);
                let attempt = attempt.clone();
                let success = success.clone();
                let cancel = cancel.clone();
                let floor = self.min_refresh_interval;
                tokio::spawn(async move {
                    poller
                        .run(attempt, success, shared.as_ref(), cancel, floor)
                        .await;
                })
            })
            .collect();

        info!(
            target: "jwtauth.registry",
            sources = self.shared.pollers.len(),
            "Key registry started"
        );

        Ok(RegistryHandle { cancel, tasks })
    }

    /// Append a key outside the polling mechanism and rebuild the serialized
    /// document before returning.
    pub fn add_direct_key(&self, key: Jwk) {
        self.shared.direct_keys.send_modify(|keys| keys.push(key));
        self.shared.rebuild();
    }

    /// The last-built serialization of the merged key set.
    #[must_use]
    pub fn serialized_key_set(&self) -> Bytes {
        self.shared.serialized.borrow().clone()
    }

    /// The merged key set at the instant of the call.
    #[must_use]
    pub fn key_set(&self) -> KeySet {
        self.shared.merged()
    }

    /// Wait until at least one source has fetched successfully.
    pub async fn wait_for_any_success(&self) {
        self.successes.wait_any().await;
    }

    /// Wait until every source has completed at least one fetch cycle,
    /// successful or not.
    pub async fn wait_for_all_attempts(&self) {
        self.attempts.wait_all().await;
    }

    /// Wait until every source has fetched successfully at least once.
    pub async fn wait_for_all_success(&self) {
        self.successes.wait_all().await;
    }

    /// Whether any source has fetched successfully. Never blocks.
    #[must_use]
    pub fn has_any_success(&self) -> bool {
        self.successes.any_done()
    }

    /// Number of remote sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.shared.pollers.len()
    }
}

impl KeySource for KeyRegistry {
    fn get_keys(&self, kid: &str) -> Vec<Jwk> {
        self.shared.get_keys(kid)
    }
}

// =============================================================================
// Registry Handle
// =============================================================================

/// Running refresh tasks of a started [`KeyRegistry`].
///
/// Dropping the handle cancels the tasks without waiting for them.
#[derive(Debug)]
pub struct RegistryHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RegistryHandle {
    /// Token that stops every refresh task when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every refresh task and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(target: "jwtauth.registry", error = %e, "Poller task failed");
            }
        }
        info!(target: "jwtauth.registry", "Key registry stopped");
    }
}

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn key(kid: &str, x: &str) -> Jwk {
        serde_json::from_value(serde_json::json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": kid,
            "x": x,
        }))
        .unwrap()
    }

    fn empty_registry() -> KeyRegistry {
        KeyRegistry::new(RegistryConfig::new(vec![])).unwrap()
    }

    #[test]
    fn test_initial_serialized_key_set_is_empty_document() {
        let registry = empty_registry();
        let doc: KeySet = serde_json::from_slice(&registry.serialized_key_set()).unwrap();
        assert!(doc.keys.is_empty());
    }

    #[test]
    fn test_direct_keys_are_looked_up_and_serialized() {
        let registry = empty_registry();
        registry.add_direct_key(key("direct-1", "AAAA"));
        registry.add_direct_key(key("direct-1", "BBBB"));
        registry.add_direct_key(key("direct-2", "CCCC"));

        assert_eq!(registry.get_keys("direct-1").len(), 2);
        assert_eq!(registry.get_keys("direct-2").len(), 1);
        assert!(registry.get_keys("missing").is_empty());

        let doc: KeySet = serde_json::from_slice(&registry.serialized_key_set()).unwrap();
        assert_eq!(doc.keys.len(), 3);
        assert_eq!(doc, registry.key_set());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = empty_registry();
        let clone = registry.clone();
        clone.add_direct_key(key("k", "AAAA"));
        assert_eq!(registry.get_keys("k").len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = KeyRegistry::new(RegistryConfig::new(vec!["not a url".to_string()]));
        assert!(matches!(err, Err(RegistryError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let registry = empty_registry();
        let handle = registry.start().unwrap();

        assert!(matches!(
            registry.clone().start(),
            Err(RegistryError::AlreadyStarted)
        ));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_sources_waits() {
        let registry = empty_registry();
        let handle = registry.start().unwrap();

        timeout(Duration::from_secs(1), registry.wait_for_all_attempts())
            .await
            .unwrap();
        timeout(Duration::from_secs(1), registry.wait_for_all_success())
            .await
            .unwrap();
        assert!(!registry.has_any_success());
        assert_eq!(registry.source_count(), 0);

        handle.shutdown().await;
    }

    #[test]
    fn test_closure_error_sink() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |source: &str, _: &FetchError| seen.lock().unwrap().push(source.to_string());
        sink.report(
            "https://a.example/jwks",
            &FetchError::Status {
                url: "https://a.example/jwks".to_string(),
                status: 500,
            },
        );
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
