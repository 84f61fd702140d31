//! Observability wiring for the service.

pub mod metrics;
