//! Bearer token verification against a live, multi-source JWKS registry.
//!
//! The crate has two halves:
//!
//! - a self-refreshing [`KeyRegistry`] that polls any number of remote JWKS
//!   endpoints on independent schedules, merges them with directly-injected
//!   keys, and lets callers wait for "any source ready" or "every source
//!   attempted" through [`AnyAllGate`];
//! - a stateless [`Verifier`] that parses a signed token, selects key
//!   candidates from any [`KeySource`], verifies the signature and validates
//!   the temporal claims.
//!
//! # Usage
//!
//! ```rust,ignore
//! use jwtauth::{KeyRegistry, RegistryConfig, Verifier};
//!
//! let registry = KeyRegistry::new(RegistryConfig::new(vec![
//!     "https://issuer.example/.well-known/jwks.json".to_string(),
//! ]))?;
//! let handle = registry.start()?;
//! registry.wait_for_any_success().await;
//!
//! let verifier = Verifier::new(registry.clone());
//! let verified = verifier.verify(raw_token)?;
//!
//! handle.shutdown().await;
//! ```

#![warn(clippy::pedantic)]

/// Authentication, fetch and registry error types
pub mod error;

/// Registry configuration
pub mod config;

/// JSON Web Key model and the key lookup trait
pub mod jwk;

/// "Any"/"all" completion gate
pub mod gate;

/// Remote JWKS poller with cache-directive driven refresh
pub mod poller;

/// Multi-source key registry
pub mod registry;

/// JWS parsing (compact and JSON serializations)
pub mod jws;

/// Verified claim types
pub mod claims;

/// Token verification pipeline
pub mod verifier;

/// Metrics recorded by the registry and verifier
pub mod metrics;

pub use claims::{Audience, StandardClaims, VerifiedToken};
pub use config::{ConfigError, RegistryConfig};
pub use error::{AuthError, FetchError, RegistryError};
pub use gate::{AnyAllGate, GateChild};
pub use jwk::{Jwk, KeySet, KeySource};
pub use poller::KeyPoller;
pub use registry::{FetchErrorSink, KeyRegistry, RegistryHandle, TracingErrorSink};
pub use verifier::Verifier;
