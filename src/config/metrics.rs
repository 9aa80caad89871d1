//! Metrics aggregation, alerting and probe configuration.

use std::time::Duration;

use serde::Deserialize;

/// Metrics aggregator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Maximum call records kept in history; oldest are evicted first.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Trailing window for snapshots and cleanup (seconds).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Interval between periodic cleanups (seconds).
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Calls an endpoint needs before error-rate alerts are evaluated.
    #[serde(default = "default_min_calls_for_alert")]
    pub min_calls_for_alert: u64,
    /// Calls an endpoint needs to appear in top-N rankings.
    #[serde(default = "default_min_calls_for_ranking")]
    pub min_calls_for_ranking: u64,
}

const fn default_history_capacity() -> usize {
    1000
}

const fn default_window_secs() -> u64 {
    30 * 60
}

const fn default_cleanup_interval_secs() -> u64 {
    5 * 60
}

const fn default_min_calls_for_alert() -> u64 {
    10
}

const fn default_min_calls_for_ranking() -> u64 {
    5
}

impl MetricsConfig {
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            min_calls_for_alert: default_min_calls_for_alert(),
            min_calls_for_ranking: default_min_calls_for_ranking(),
        }
    }
}

/// Alert thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertThresholds {
    /// Error rate at or above which a warning is raised.
    #[serde(default = "default_error_rate_warning")]
    pub error_rate_warning: f64,
    /// Error rate at or above which a critical alert is raised.
    #[serde(default = "default_error_rate_critical")]
    pub error_rate_critical: f64,
    /// Single-call latency above which a critical alert is raised (ms).
    #[serde(default = "default_critical_response_time_ms")]
    pub critical_response_time_ms: f64,
}

fn default_error_rate_warning() -> f64 {
    0.05
}

fn default_error_rate_critical() -> f64 {
    0.15
}

fn default_critical_response_time_ms() -> f64 {
    5000.0
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            error_rate_warning: default_error_rate_warning(),
            error_rate_critical: default_error_rate_critical(),
            critical_response_time_ms: default_critical_response_time_ms(),
        }
    }
}

/// An endpoint polled by the runtime through the instrumented HTTP client.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Label used in logs; defaults to the URL.
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default = "default_probe_method")]
    pub method: String,
    #[serde(default = "default_probe_interval_secs")]
    pub interval_secs: u64,
}

fn default_probe_method() -> String {
    "GET".into()
}

const fn default_probe_interval_secs() -> u64 {
    60
}

impl ProbeConfig {
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
