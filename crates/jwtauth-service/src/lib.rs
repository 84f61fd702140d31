//! jwtauth service
//!
//! Framework adapters and a small HTTP service around the `jwtauth` key
//! registry and verifier.
//!
//! # Modules
//!
//! - [`bearer`] - `Authorization: Bearer` parsing shared by every adapter
//! - [`verifier`] - the adapter-facing verification seam
//! - [`middleware`] - axum authentication middleware
//! - [`grpc`] - tonic authentication interceptor
//! - [`routes`] / [`handlers`] - well-known key set, health, metrics, whoami
//! - [`config`] - environment configuration for the binary

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bearer;
pub mod config;
pub mod errors;
pub mod grpc;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod verifier;
