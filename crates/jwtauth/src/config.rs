//! Key registry configuration.

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout for JWKS fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default minimum delay between two fetches of the same endpoint.
///
/// Applied even when the endpoint advertises a shorter `max-age` or none at
/// all, so a misbehaving endpoint cannot drive the poll rate up.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Rejections from [`RegistryConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A JWKS URL does not parse or is not http(s).
    #[error("Invalid JWKS URL: {0}")]
    InvalidUrl(String),

    /// A timeout or refresh interval is zero.
    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),
}

/// Configuration for a [`crate::KeyRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// JWKS endpoints to poll, one poller each, in lookup order.
    pub jwks_urls: Vec<String>,

    /// Timeout applied to every JWKS request.
    pub fetch_timeout: Duration,

    /// Floor for the delay between fetches of one endpoint.
    pub min_refresh_interval: Duration,
}

impl RegistryConfig {
    /// Create a configuration with default timeouts.
    #[must_use]
    pub fn new(jwks_urls: Vec<String>) -> Self {
        Self {
            jwks_urls,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    /// Set the fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the refresh floor.
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Check that every URL is an absolute http(s) URL and that the
    /// durations are non-zero.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` or `ConfigError::InvalidDuration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for raw in &self.jwks_urls {
            let url = Url::parse(raw)
                .map_err(|e| ConfigError::InvalidUrl(format!("'{raw}': {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::InvalidUrl(format!(
                    "'{raw}': scheme must be http or https"
                )));
            }
        }

        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "fetch timeout must be greater than 0".to_string(),
            ));
        }

        if self.min_refresh_interval.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "minimum refresh interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
