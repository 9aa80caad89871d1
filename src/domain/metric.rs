//! Outbound call measurements and per-endpoint aggregates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::id::TraceId;

/// Strip the query string and fragment from a request URL.
#[must_use]
pub fn normalize_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// `(HTTP method, normalized path)` pair used to group call metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EndpointKey {
    pub method: String,
    pub endpoint: String,
}

impl EndpointKey {
    /// Build a key, upper-casing the method and normalizing the URL.
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            endpoint: normalize_url(url).to_string(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)
    }
}

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    ClientError,
    ServerError,
    UnknownError,
}

impl ErrorType {
    #[must_use]
    pub const fn classify(status_code: u16) -> Self {
        match status_code {
            400..=499 => Self::ClientError,
            500..=u16::MAX => Self::ServerError,
            _ => Self::UnknownError,
        }
    }
}

/// A completed outbound call, as reported by the caller.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub method: String,
    pub url: String,
    /// HTTP status, or 0 when no response was received.
    pub status_code: u16,
    pub duration_ms: f64,
    pub trace_id: TraceId,
    pub request_size: Option<u64>,
    pub response_size: Option<u64>,
    pub error_message: Option<String>,
    pub retry_count: Option<u32>,
}

impl CallOutcome {
    /// Create an outcome with a freshly generated trace id.
    pub fn new(method: impl Into<String>, url: impl Into<String>, status_code: u16, duration_ms: f64) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status_code,
            duration_ms,
            trace_id: TraceId::generate(),
            request_size: None,
            response_size: None,
            error_message: None,
            retry_count: None,
        }
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    #[must_use]
    pub fn with_request_size(mut self, bytes: u64) -> Self {
        self.request_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_response_size(mut self, bytes: u64) -> Self {
        self.response_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = Some(retries);
        self
    }
}

/// One record per completed outbound call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetric {
    pub id: Uuid,
    pub method: String,
    #[serde(rename = "normalizedURL")]
    pub normalized_url: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub trace_id: TraceId,
    pub request_size: Option<u64>,
    pub response_size: Option<u64>,
    pub error_type: Option<ErrorType>,
    pub error_message: Option<String>,
    pub retry_count: Option<u32>,
}

impl CallMetric {
    /// Build the immutable record for an outcome observed at `timestamp`.
    #[must_use]
    pub fn from_outcome(outcome: CallOutcome, timestamp: DateTime<Utc>) -> Self {
        let key = EndpointKey::new(&outcome.method, &outcome.url);
        let failed = outcome.status_code >= 400
            || outcome.status_code == 0
            || outcome.error_message.is_some();

        Self {
            id: Uuid::new_v4(),
            method: key.method,
            normalized_url: key.endpoint,
            status_code: outcome.status_code,
            duration_ms: outcome.duration_ms,
            timestamp,
            trace_id: outcome.trace_id,
            request_size: outcome.request_size,
            response_size: outcome.response_size,
            error_type: failed.then(|| ErrorType::classify(outcome.status_code)),
            error_message: outcome.error_message,
            retry_count: outcome.retry_count,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_type.is_some()
    }

    #[must_use]
    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            method: self.method.clone(),
            endpoint: self.normalized_url.clone(),
        }
    }

    #[must_use]
    pub fn matches(&self, key: &EndpointKey) -> bool {
        self.method == key.method && self.normalized_url == key.endpoint
    }
}

/// Rolling aggregate for one endpoint key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub method: String,
    pub endpoint: String,
    pub total_calls: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub avg_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    pub error_rate: f64,
    pub last_call_timestamp: DateTime<Utc>,
}

impl EndpointStats {
    /// Start an aggregate from the first call seen for a key.
    #[must_use]
    pub fn first(metric: &CallMetric) -> Self {
        let error = u64::from(metric.is_error());
        Self {
            method: metric.method.clone(),
            endpoint: metric.normalized_url.clone(),
            total_calls: 1,
            success_count: 1 - error,
            error_count: error,
            avg_response_time: metric.duration_ms,
            min_response_time: metric.duration_ms,
            max_response_time: metric.duration_ms,
            p95_response_time: metric.duration_ms,
            p99_response_time: metric.duration_ms,
            error_rate: error as f64,
            last_call_timestamp: metric.timestamp,
        }
    }

    /// Fold one more call into the running counters.
    ///
    /// Percentiles are left untouched; they are recomputed from history.
    pub fn apply(&mut self, metric: &CallMetric) {
        let previous = self.total_calls as f64;
        self.avg_response_time =
            (self.avg_response_time * previous + metric.duration_ms) / (previous + 1.0);
        self.min_response_time = self.min_response_time.min(metric.duration_ms);
        self.max_response_time = self.max_response_time.max(metric.duration_ms);

        self.total_calls += 1;
        if metric.is_error() {
            self.error_count += 1;
        } else {
            self.success_count += 1;
        }
        self.error_rate = self.error_count as f64 / self.total_calls as f64;
        self.last_call_timestamp = metric.timestamp;
    }

    #[must_use]
    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            method: self.method.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Overall health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}
