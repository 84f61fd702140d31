//! Remote JWKS poller.
//!
//! One [`KeyPoller`] per configured endpoint. Each poller owns its snapshot of
//! the endpoint's key set and an independent refresh loop ([`KeyPoller::run`]).
//!
//! # Refresh schedule
//!
//! The delay before the next fetch is the endpoint's `Cache-Control: max-age`
//! directive, floored at the configured minimum refresh interval. A missing or
//! malformed directive yields the floor. Failed fetches retry after the floor.
//!
//! # Snapshots
//!
//! A successful fetch replaces the snapshot wholesale; it never merges with the
//! previous set. A failed fetch leaves the previous snapshot in place, so a
//! broken endpoint keeps serving its last known good keys.

use crate::error::FetchError;
use crate::gate::GateChild;
use crate::jwk::KeySet;
use crate::metrics;
use reqwest::header::CACHE_CONTROL;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Hooks invoked by [`KeyPoller::run`] after each fetch cycle.
pub trait PollObserver: Send + Sync {
    /// Called after the poller swapped in a new snapshot, before the cycle's
    /// success is signalled.
    fn key_set_replaced(&self, _source: &KeyPoller) {}

    /// Called when a fetch cycle failed.
    fn fetch_failed(&self, _source: &KeyPoller, _error: &FetchError) {}
}

/// Observer that does nothing.
impl PollObserver for () {}

/// Poller for one remote JWKS endpoint.
#[derive(Debug)]
pub struct KeyPoller {
    url: String,
    client: reqwest::Client,
    snapshot: watch::Sender<Option<Arc<KeySet>>>,
}

impl KeyPoller {
    /// Create a poller for `url`. No request is made until
    /// [`KeyPoller::load_once`] or [`KeyPoller::run`] is called.
    #[must_use]
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            url: url.into(),
            client,
            snapshot,
        }
    }

    /// The endpoint this poller fetches.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The most recently fetched key set, or `None` before the first success.
    ///
    /// Holds the snapshot lock only for a pointer clone.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.snapshot.borrow().clone()
    }

    /// Perform one fetch-and-parse cycle.
    ///
    /// On success the snapshot is replaced and the endpoint's `max-age`
    /// directive is returned (`None` when absent or malformed). On failure the
    /// previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the request fails, the endpoint answers with a
    /// non-success status, or the body is not a JWKS document.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn load_once(&self) -> Result<Option<Duration>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_max_age);

        let body = response.bytes().await.map_err(|e| FetchError::Request {
            url: self.url.clone(),
            message: e.to_string(),
        })?;

        let key_set: KeySet = serde_json::from_slice(&body).map_err(|e| FetchError::Parse {
            url: self.url.clone(),
            message: e.to_string(),
        })?;

        debug!(
            target: "jwtauth.poller",
            url = %self.url,
            keys = key_set.keys.len(),
            max_age_secs = max_age.map(|d| d.as_secs()),
            "Fetched key set"
        );

        self.snapshot.send_replace(Some(Arc::new(key_set)));
        Ok(max_age)
    }

    /// Refresh loop. Runs until `cancel` fires.
    ///
    /// Every cycle completes `attempt`; successful cycles first notify the
    /// observer and complete `success`. Cancellation interrupts both the
    /// in-flight fetch and the inter-cycle sleep.
    pub async fn run(
        &self,
        attempt: GateChild,
        success: GateChild,
        observer: &dyn PollObserver,
        cancel: CancellationToken,
        floor: Duration,
    ) {
        loop {
            let started = Instant::now();
            let result = tokio::select! {
                result = self.load_once() => result,
                () = cancel.cancelled() => break,
            };

            let max_age = match result {
                Ok(max_age) => {
                    metrics::record_key_fetch("success", started.elapsed());
                    observer.key_set_replaced(self);
                    if !success.is_complete() {
                        info!(
                            target: "jwtauth.poller",
                            url = %self.url,
                            "Initial key set loaded"
                        );
                    }
                    success.complete();
                    max_age
                }
                Err(e) => {
                    metrics::record_key_fetch("error", started.elapsed());
                    observer.fetch_failed(self, &e);
                    None
                }
            };
            attempt.complete();

            let delay = next_refresh_delay(max_age, floor);
            debug!(
                target: "jwtauth.poller",
                url = %self.url,
                delay_secs = delay.as_secs(),
                "Next key set refresh scheduled"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => break,
            }
        }

        debug!(target: "jwtauth.poller", url = %self.url, "Poller stopped");
    }
}

/// Extract the `max-age` directive from a `Cache-Control` value.
///
/// Directive names match case-insensitively. Other directives, and `max-age`
/// values that are not non-negative integers, are skipped.
#[must_use]
pub fn parse_max_age(header: &str) -> Option<Duration> {
    header.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value
            .trim()
            .trim_matches('"')
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    })
}

/// Delay before the next fetch: the advertised `max-age`, never below `floor`.
#[must_use]
pub fn next_refresh_delay(max_age: Option<Duration>, floor: Duration) -> Duration {
    max_age.unwrap_or(Duration::ZERO).max(floor)
}
