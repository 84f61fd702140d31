//! HTTP handlers.

mod health;
mod jwks;
mod metrics;
mod whoami;

pub use health::{health_check, readiness_check};
pub use jwks::published_key_set;
pub use metrics::metrics_handler;
pub use whoami::whoami;
