//! gRPC adapters.

pub mod auth_interceptor;

pub use auth_interceptor::{verified_token, GrpcAuthInterceptor};
