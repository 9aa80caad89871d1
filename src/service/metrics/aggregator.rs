//! Thread-safe aggregator of outbound call measurements.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::percentile::{percentile, sorted};
use super::snapshot::{AggregateStats, AggregatorExport};
use crate::attributes;
use crate::config::{AlertThresholds, MetricsConfig};
use crate::domain::{
    Alert, AlertType, CallMetric, CallOutcome, EndpointKey, EndpointStats, HealthStatus,
};
use crate::port::{events, Sink};

/// Records completed calls into a bounded history and per-endpoint stats.
///
/// History append/evict and the endpoint update happen under one lock, so
/// readers never observe stats that disagree with history. Alerts are
/// evaluated under the lock and delivered to the sink after releasing it.
pub struct MetricsAggregator {
    config: MetricsConfig,
    thresholds: AlertThresholds,
    sink: Arc<dyn Sink>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    history: VecDeque<CallMetric>,
    endpoints: HashMap<EndpointKey, EndpointStats>,
}

impl Inner {
    /// p95/p99 over the records of `key` still in history.
    fn percentiles_for(&self, key: &EndpointKey) -> (f64, f64) {
        let durations = sorted(
            self.history
                .iter()
                .filter(|m| m.matches(key))
                .map(|m| m.duration_ms)
                .collect(),
        );
        (percentile(&durations, 0.95), percentile(&durations, 0.99))
    }

    /// Rebuild every endpoint aggregate from the current history.
    fn rebuild(&mut self) {
        let mut endpoints: HashMap<EndpointKey, EndpointStats> = HashMap::new();
        let mut durations: HashMap<EndpointKey, Vec<f64>> = HashMap::new();

        for metric in &self.history {
            let key = metric.key();
            durations
                .entry(key.clone())
                .or_default()
                .push(metric.duration_ms);
            endpoints
                .entry(key)
                .and_modify(|stats| stats.apply(metric))
                .or_insert_with(|| EndpointStats::first(metric));
        }

        for (key, stats) in &mut endpoints {
            if let Some(values) = durations.remove(key) {
                let values = sorted(values);
                stats.p95_response_time = percentile(&values, 0.95);
                stats.p99_response_time = percentile(&values, 0.99);
            }
        }

        self.endpoints = endpoints;
    }
}

/// Earliest timestamp inside a trailing `window` ending at `now`.
fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl MetricsAggregator {
    pub fn new(config: MetricsConfig, thresholds: AlertThresholds, sink: Arc<dyn Sink>) -> Self {
        Self {
            config,
            thresholds,
            sink,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Default trailing window for snapshots and cleanup.
    pub fn window(&self) -> Duration {
        self.config.window()
    }

    /// Record a completed call observed now.
    ///
    /// Returns the alerts raised by this call; they have already been sent
    /// to the sink.
    pub fn record_call(&self, outcome: CallOutcome) -> Vec<Alert> {
        self.record_call_at(outcome, Utc::now())
    }

    /// Record a completed call observed at `at`.
    pub fn record_call_at(&self, outcome: CallOutcome, at: DateTime<Utc>) -> Vec<Alert> {
        let metric = CallMetric::from_outcome(outcome, at);
        let key = metric.key();

        let alerts = {
            let mut inner = self.inner.lock();
            inner.history.push_back(metric.clone());
            while inner.history.len() > self.config.history_capacity {
                inner.history.pop_front();
            }

            let (p95, p99) = inner.percentiles_for(&key);
            let stats = inner
                .endpoints
                .entry(key)
                .and_modify(|stats| stats.apply(&metric))
                .or_insert_with(|| EndpointStats::first(&metric));
            stats.p95_response_time = p95;
            stats.p99_response_time = p99;

            self.evaluate(stats, &metric)
        };

        debug!(
            method = %metric.method,
            endpoint = %metric.normalized_url,
            status = metric.status_code,
            duration_ms = metric.duration_ms,
            trace_id = %metric.trace_id,
            "Recorded call"
        );

        for alert in &alerts {
            self.emit(alert);
        }
        alerts
    }

    fn evaluate(&self, stats: &EndpointStats, metric: &CallMetric) -> Vec<Alert> {
        let alert = |alert_type, value, threshold| Alert {
            alert_type,
            method: metric.method.clone(),
            endpoint: metric.normalized_url.clone(),
            value,
            threshold,
            trace_id: metric.trace_id.clone(),
            timestamp: metric.timestamp,
        };

        let mut alerts = Vec::new();
        let thresholds = &self.thresholds;

        if stats.total_calls >= self.config.min_calls_for_alert {
            if stats.error_rate >= thresholds.error_rate_critical {
                alerts.push(alert(
                    AlertType::CriticalErrorRate,
                    stats.error_rate,
                    thresholds.error_rate_critical,
                ));
            } else if stats.error_rate >= thresholds.error_rate_warning {
                alerts.push(alert(
                    AlertType::HighErrorRate,
                    stats.error_rate,
                    thresholds.error_rate_warning,
                ));
            }
        }

        if metric.duration_ms > thresholds.critical_response_time_ms {
            alerts.push(alert(
                AlertType::CriticalResponseTime,
                metric.duration_ms,
                thresholds.critical_response_time_ms,
            ));
        }

        alerts
    }

    fn emit(&self, alert: &Alert) {
        warn!(
            alert_type = %alert.alert_type,
            severity = alert.severity().as_str(),
            method = %alert.method,
            endpoint = %alert.endpoint,
            value = alert.value,
            threshold = alert.threshold,
            "API alert"
        );
        self.sink.record(
            events::API_ALERT,
            attributes! {
                "alertType" => alert.alert_type.as_str(),
                "severity" => alert.severity().as_str(),
                "endpoint" => alert.endpoint,
                "method" => alert.method,
                "value" => alert.value,
                "threshold" => alert.threshold,
                "traceId" => alert.trace_id,
                "timestamp" => alert.timestamp,
            },
        );
    }

    /// Aggregate stats over the trailing `window`.
    pub fn current_stats(&self, window: Duration) -> AggregateStats {
        self.stats_at(Utc::now(), window)
    }

    /// Aggregate stats over the `window` ending at `now`.
    pub fn stats_at(&self, now: DateTime<Utc>, window: Duration) -> AggregateStats {
        let start = window_start(now, window);
        let inner = self.inner.lock();

        let mut durations = Vec::new();
        let mut error_count = 0u64;
        let mut endpoints = HashSet::new();
        for metric in inner.history.iter().filter(|m| m.timestamp >= start) {
            durations.push(metric.duration_ms);
            if metric.is_error() {
                error_count += 1;
            }
            endpoints.insert((metric.method.as_str(), metric.normalized_url.as_str()));
        }
        let endpoint_count = endpoints.len();
        drop(endpoints);
        drop(inner);

        let total_calls = durations.len() as u64;
        let durations = sorted(durations);
        let (error_rate, avg_response_time) = if total_calls == 0 {
            (0.0, 0.0)
        } else {
            (
                error_count as f64 / total_calls as f64,
                durations.iter().sum::<f64>() / total_calls as f64,
            )
        };
        let minutes = window.as_secs_f64() / 60.0;

        AggregateStats {
            window_secs: window.as_secs(),
            total_calls,
            success_count: total_calls - error_count,
            error_count,
            error_rate,
            avg_response_time,
            p50_response_time: percentile(&durations, 0.5),
            p95_response_time: percentile(&durations, 0.95),
            p99_response_time: percentile(&durations, 0.99),
            calls_per_minute: if minutes > 0.0 {
                total_calls as f64 / minutes
            } else {
                0.0
            },
            endpoint_count,
            generated_at: now,
        }
    }

    /// Stats for one `(method, url)` key. The URL is normalized first.
    pub fn endpoint_stats(&self, method: &str, url: &str) -> Option<EndpointStats> {
        let key = EndpointKey::new(method, url);
        self.inner.lock().endpoints.get(&key).cloned()
    }

    /// Every endpoint aggregate, ordered by method then path.
    pub fn all_endpoint_stats(&self) -> Vec<EndpointStats> {
        let mut stats: Vec<EndpointStats> = self.inner.lock().endpoints.values().cloned().collect();
        stats.sort_by(|a, b| (&a.method, &a.endpoint).cmp(&(&b.method, &b.endpoint)));
        stats
    }

    fn ranked<F>(&self, n: usize, score: F) -> Vec<EndpointStats>
    where
        F: Fn(&EndpointStats) -> f64,
    {
        let mut eligible: Vec<EndpointStats> = self
            .inner
            .lock()
            .endpoints
            .values()
            .filter(|s| s.total_calls >= self.config.min_calls_for_ranking)
            .cloned()
            .collect();
        eligible.sort_by(|a, b| {
            score(b)
                .total_cmp(&score(a))
                .then_with(|| (&a.method, &a.endpoint).cmp(&(&b.method, &b.endpoint)))
        });
        eligible.truncate(n);
        eligible
    }

    /// Up to `n` endpoints with the highest error rate.
    pub fn top_error_endpoints(&self, n: usize) -> Vec<EndpointStats> {
        self.ranked(n, |s| s.error_rate)
    }

    /// Up to `n` endpoints with the highest average latency.
    pub fn slowest_endpoints(&self, n: usize) -> Vec<EndpointStats> {
        self.ranked(n, |s| s.avg_response_time)
    }

    /// The `n` most recent failed calls, newest first.
    pub fn recent_errors(&self, n: usize) -> Vec<CallMetric> {
        self.inner
            .lock()
            .history
            .iter()
            .rev()
            .filter(|m| m.is_error())
            .take(n)
            .cloned()
            .collect()
    }

    /// Health over the default window.
    pub fn health(&self) -> HealthStatus {
        self.health_at(Utc::now())
    }

    pub fn health_at(&self, now: DateTime<Utc>) -> HealthStatus {
        self.stats_at(now, self.window()).health(
            self.thresholds.error_rate_warning,
            self.thresholds.error_rate_critical,
        )
    }

    /// Full dump of history and endpoint aggregates.
    pub fn export(&self) -> AggregatorExport {
        let now = Utc::now();
        let summary = self.stats_at(now, self.window());
        let health = summary.health(
            self.thresholds.error_rate_warning,
            self.thresholds.error_rate_critical,
        );
        let history = self.inner.lock().history.iter().cloned().collect();

        AggregatorExport {
            generated_at: now,
            health,
            summary,
            endpoints: self.all_endpoint_stats(),
            history,
        }
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// Purge history older than the window and recompute all endpoint stats.
    ///
    /// Returns the number of records purged.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let start = window_start(now, self.window());
        let mut inner = self.inner.lock();

        let before = inner.history.len();
        inner.history.retain(|m| m.timestamp >= start);
        let purged = before - inner.history.len();
        inner.rebuild();

        info!(
            purged,
            remaining = inner.history.len(),
            endpoints = inner.endpoints.len(),
            "Metrics cleanup complete"
        );
        purged
    }

    /// Clear history and every endpoint aggregate.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.history.clear();
        inner.endpoints.clear();
        info!("Metrics reset");
    }

    /// Run [`cleanup`](Self::cleanup) every `interval` on a background task.
    ///
    /// The first run happens one full interval after spawning.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> CleanupHandle {
        let aggregator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                aggregator.cleanup();
            }
        });
        CleanupHandle { task }
    }
}

/// Handle to the periodic cleanup task. Dropping it does not stop the task.
pub struct CleanupHandle {
    task: JoinHandle<()>,
}

impl CleanupHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}
