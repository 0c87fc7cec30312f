//! HTTP and WebSocket request handlers for the signaling relay.

pub mod info;
pub mod metrics;
pub mod ws;

pub use info::service_info;
pub use metrics::metrics_handler;
pub use ws::signaling_ws;
