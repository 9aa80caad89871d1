//! Builders for wire envelopes, call outcomes and canonical configs.

use serde_json::{json, Value};

use crate::config::{AlertThresholds, MetricsConfig, ReconnectionConfig};
use crate::domain::CallOutcome;

/// Fixed timestamp used by [`envelope`].
pub const ENVELOPE_TIMESTAMP: &str = "2024-03-01T12:00:00Z";

/// Serialize an inbound `{type, data, timestamp}` frame.
pub fn envelope(kind: &str, data: Value) -> String {
    json!({
        "type": kind,
        "data": data,
        "timestamp": ENVELOPE_TIMESTAMP,
    })
    .to_string()
}

/// A completed call with a random trace id.
pub fn call(method: &str, url: &str, status: u16, duration_ms: f64) -> CallOutcome {
    CallOutcome::new(method, url, status, duration_ms)
}

/// Default backoff policy: 1s doubling to 30s, five attempts.
pub fn reconnection() -> ReconnectionConfig {
    ReconnectionConfig::default()
}

/// Metrics settings with a small history for eviction tests.
pub fn metrics_with_capacity(history_capacity: usize) -> MetricsConfig {
    MetricsConfig {
        history_capacity,
        ..MetricsConfig::default()
    }
}

pub fn thresholds() -> AlertThresholds {
    AlertThresholds::default()
}
