//! Observability for the signaling relay.
//!
//! Provides Prometheus metric definitions and the liveness/readiness state
//! behind the health probes.

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
