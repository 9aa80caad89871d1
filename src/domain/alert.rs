//! Threshold breach alerts raised by the metrics aggregator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::TraceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Endpoint error rate crossed the warning threshold.
    HighErrorRate,
    /// Endpoint error rate crossed the critical threshold.
    CriticalErrorRate,
    /// A single call exceeded the critical latency threshold.
    CriticalResponseTime,
}

impl AlertType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighErrorRate => "high_error_rate",
            Self::CriticalErrorRate => "critical_error_rate",
            Self::CriticalResponseTime => "critical_response_time",
        }
    }

    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::HighErrorRate => Severity::Warning,
            Self::CriticalErrorRate | Self::CriticalResponseTime => Severity::Critical,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// One breach observed while recording a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub alert_type: AlertType,
    pub method: String,
    pub endpoint: String,
    /// Observed value: an error rate or a duration in milliseconds.
    pub value: f64,
    pub threshold: f64,
    pub trace_id: TraceId,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.alert_type.severity()
    }
}
