//! Serializable views over aggregator state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{CallMetric, EndpointStats, HealthStatus};
use crate::error::Result;

/// Aggregate figures over a trailing window of history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub window_secs: u64,
    pub total_calls: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub avg_response_time: f64,
    pub p50_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    pub calls_per_minute: f64,
    pub endpoint_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl AggregateStats {
    /// Classify by error rate against the warning and critical thresholds.
    #[must_use]
    pub fn health(&self, warning: f64, critical: f64) -> HealthStatus {
        if self.error_rate >= critical {
            HealthStatus::Critical
        } else if self.error_rate >= warning {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Full dump of aggregator state for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorExport {
    pub generated_at: DateTime<Utc>,
    pub health: HealthStatus,
    pub summary: AggregateStats,
    pub endpoints: Vec<EndpointStats>,
    pub history: Vec<CallMetric>,
}

impl AggregatorExport {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
