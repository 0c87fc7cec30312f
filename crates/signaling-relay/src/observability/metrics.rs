//! Metrics definitions for the signaling relay.
//!
//! All metrics follow Prometheus naming conventions:
//! - `relay_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `reason` on send failures: 2 values (closed, backpressure)
//! - `reason` on auth rejections: 5 values (see `AuthError::reason`)
//!
//! Room codes and peer IDs are never used as labels.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded; metrics recorded earlier
/// are dropped.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Registry Gauges
// ============================================================================

/// Metric: `relay_rooms_active`
#[allow(clippy::cast_precision_loss)]
pub fn set_rooms_active(count: usize) {
    gauge!("relay_rooms_active").set(count as f64);
}

/// Metric: `relay_peers_active`
#[allow(clippy::cast_precision_loss)]
pub fn set_peers_active(count: usize) {
    gauge!("relay_peers_active").set(count as f64);
}

// ============================================================================
// Relay Counters
// ============================================================================

/// Record messages handed to recipients' outbound queues.
///
/// Metric: `relay_messages_relayed_total`
pub fn record_messages_relayed(count: usize) {
    if count > 0 {
        counter!("relay_messages_relayed_total").increment(count as u64);
    }
}

/// Record a failed enqueue to one recipient.
///
/// Metric: `relay_send_failures_total`
/// Labels: `reason`
pub fn record_send_failure(reason: &'static str) {
    counter!("relay_send_failures_total", "reason" => reason).increment(1);
}

/// Record a rejected connection attempt.
///
/// Metric: `relay_auth_rejections_total`
/// Labels: `reason`
pub fn record_auth_rejection(reason: &'static str) {
    counter!("relay_auth_rejections_total", "reason" => reason).increment(1);
}

/// Record a session ended by malformed client input.
///
/// Metric: `relay_protocol_errors_total`
pub fn record_protocol_error() {
    counter!("relay_protocol_errors_total").increment(1);
}
