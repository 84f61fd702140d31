//! Service configuration.
//!
//! Loaded from environment variables. Invalid values are rejected rather
//! than replaced with defaults.

use jwtauth::RegistryConfig;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default `max-age` advertised on the published key set.
pub const DEFAULT_PUBLISH_MAX_AGE_SECONDS: u64 = 300;

/// Default bound on waiting for the first key source at startup.
pub const DEFAULT_STARTUP_WAIT_SECONDS: u64 = 10;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Remote key set endpoints.
    pub jwks_urls: Vec<String>,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout for key set fetches.
    pub fetch_timeout: Duration,

    /// Floor between polls of a single endpoint.
    pub min_refresh_interval: Duration,

    /// `max-age` sent with `/.well-known/jwks.json`.
    pub publish_max_age_seconds: u64,

    /// How long startup waits for any key source before serving anyway.
    pub startup_wait: Duration,

    /// Let requests without an `Authorization` header through unauthenticated.
    pub allow_anonymous: bool,

    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Invalid key registry configuration: {0}")]
    Registry(#[from] jwtauth::ConfigError),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `JWKS_URLS` is missing or empty, or any
    /// variable fails to parse.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_urls: Vec<String> = vars
            .get("JWKS_URLS")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWKS_URLS".to_string()))?
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();

        if jwks_urls.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "JWKS_URLS".to_string(),
                reason: "at least one URL is required".to_string(),
            });
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let fetch_timeout = Duration::from_secs(parse_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            jwtauth::config::DEFAULT_FETCH_TIMEOUT.as_secs(),
        )?);

        let min_refresh_interval = Duration::from_secs(parse_seconds(
            vars,
            "JWKS_MIN_REFRESH_SECONDS",
            jwtauth::config::DEFAULT_MIN_REFRESH_INTERVAL.as_secs(),
        )?);

        let publish_max_age_seconds = parse_seconds(
            vars,
            "JWKS_PUBLISH_MAX_AGE_SECONDS",
            DEFAULT_PUBLISH_MAX_AGE_SECONDS,
        )?;

        let startup_wait = Duration::from_secs(parse_seconds(
            vars,
            "STARTUP_WAIT_SECONDS",
            DEFAULT_STARTUP_WAIT_SECONDS,
        )?);

        let allow_anonymous = match vars.get("AUTH_ALLOW_ANONYMOUS") {
            None => false,
            Some(value) => parse_bool("AUTH_ALLOW_ANONYMOUS", value)?,
        };

        let log_format = match vars.get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()) {
            None => LogFormat::default(),
            Some(value) if value == "text" => LogFormat::Text,
            Some(value) if value == "json" => LogFormat::Json,
            Some(value) => {
                return Err(ConfigError::InvalidValue {
                    name: "LOG_FORMAT".to_string(),
                    reason: format!("expected 'text' or 'json', got '{value}'"),
                })
            }
        };

        let config = Self {
            jwks_urls,
            bind_address,
            fetch_timeout,
            min_refresh_interval,
            publish_max_age_seconds,
            startup_wait,
            allow_anonymous,
            log_format,
        };

        config.registry_config().validate()?;

        Ok(config)
    }

    /// Key registry settings derived from this configuration.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(self.jwks_urls.clone())
            .with_fetch_timeout(self.fetch_timeout)
            .with_min_refresh_interval(self.min_refresh_interval)
    }
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{value}' is not a number of seconds: {e}"),
        }),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{value}' is not a boolean"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "JWKS_URLS".to_string(),
            "https://a.example/jwks.json, https://b.example/jwks.json".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(
            config.jwks_urls,
            vec![
                "https://a.example/jwks.json".to_string(),
                "https://b.example/jwks.json".to_string()
            ]
        );
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.min_refresh_interval, Duration::from_secs(30));
        assert_eq!(config.publish_max_age_seconds, 300);
        assert_eq!(config.startup_wait, Duration::from_secs(10));
        assert!(!config.allow_anonymous);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_from_vars_overrides() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string());
        vars.insert("JWKS_MIN_REFRESH_SECONDS".to_string(), "60".to_string());
        vars.insert("JWKS_PUBLISH_MAX_AGE_SECONDS".to_string(), "0".to_string());
        vars.insert("STARTUP_WAIT_SECONDS".to_string(), "0".to_string());
        vars.insert("AUTH_ALLOW_ANONYMOUS".to_string(), "TRUE".to_string());
        vars.insert("LOG_FORMAT".to_string(), "json".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.min_refresh_interval, Duration::from_secs(60));
        assert_eq!(config.publish_max_age_seconds, 0);
        assert_eq!(config.startup_wait, Duration::ZERO);
        assert!(config.allow_anonymous);
        assert_eq!(config.log_format, LogFormat::Json);

        let registry = config.registry_config();
        assert_eq!(registry.jwks_urls.len(), 2);
        assert_eq!(registry.fetch_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_jwks_urls() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "JWKS_URLS"));
    }

    #[test]
    fn test_blank_jwks_urls() {
        let vars = HashMap::from([("JWKS_URLS".to_string(), " , ".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let vars = HashMap::from([("JWKS_URLS".to_string(), "ftp://a.example/keys".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::Registry(_))
        ));
    }

    #[test]
    fn test_zero_refresh_interval_is_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_MIN_REFRESH_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::Registry(_))
        ));
    }

    #[test]
    fn test_invalid_numbers_and_flags() {
        for (name, value) in [
            ("JWKS_FETCH_TIMEOUT_SECONDS", "soon"),
            ("STARTUP_WAIT_SECONDS", "-1"),
            ("AUTH_ALLOW_ANONYMOUS", "maybe"),
            ("LOG_FORMAT", "xml"),
        ] {
            let mut vars = base_vars();
            vars.insert(name.to_string(), value.to_string());
            let result = Config::from_vars(&vars);
            assert!(
                matches!(&result, Err(ConfigError::InvalidValue { name: n, .. }) if n == name),
                "{name}={value} gave {result:?}"
            );
        }
    }
}
