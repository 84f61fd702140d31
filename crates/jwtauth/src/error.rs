//! Error types for token verification and key fetching.
//!
//! [`AuthError`] is the only error a verifier caller ever sees; every variant
//! is a rejection reason that is safe to hand back to the presenter of the
//! token. [`FetchError`] is operational: it is reported to the registry's
//! error sink and never reaches a verification call.

use crate::config::ConfigError;
use thiserror::Error;

/// Authentication failures produced by [`crate::Verifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is not a structurally valid signed token.
    #[error("malformed token")]
    InvalidToken,

    /// No registered key matches the token's key identifier.
    #[error("unknown signing key {0:?}")]
    UnknownKey(String),

    /// None of the candidate keys verifies the token's signature.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The verified payload does not decode as the expected claims.
    #[error("token claims are invalid")]
    InvalidClaims,

    /// The `exp` claim is missing or not in the future.
    #[error("token has expired")]
    ExpiredToken,

    /// The `nbf` claim is still in the future.
    #[error("token is not yet valid")]
    NotYetValid,
}

impl AuthError {
    /// Stable, low-cardinality label for metrics and structured logs.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::InvalidToken => "invalid_token",
            AuthError::UnknownKey(_) => "unknown_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::ExpiredToken => "expired_token",
            AuthError::NotYetValid => "not_yet_valid",
        }
    }
}

/// Failure of one fetch cycle against a remote JWKS endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body is not a JWKS document.
    #[error("failed to parse key set from {url}: {message}")]
    Parse { url: String, message: String },
}

/// Errors raised while constructing or starting a [`crate::KeyRegistry`].
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// `start()` was called on a registry whose pollers are already running.
    #[error("key registry already started")]
    AlreadyStarted,
}
