//! # jwtauth Test Utilities
//!
//! Shared test utilities for the `jwtauth` crates.
//!
//! This crate provides:
//! - Deterministic Ed25519, generated P-256 and fixed RSA key fixtures
//! - Token signing helpers (compact and JSON serialization)
//! - A claims builder (`TestClaimsBuilder`)
//! - Mock JWKS endpoints on `wiremock`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jwtauth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::new(1, "test-key-01");
//!     let server = start_jwks_server(&[keypair.jwk_json()]).await;
//!
//!     let token = keypair.sign_token(&TestClaimsBuilder::new().for_subject("alice").build());
//!     // point a registry at jwks_url(&server) and verify `token`
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use token_builders::*;
