//! Sink adapters.
//!
//! Implements the `port::Sink` trait for logging, fan-out and discard.

use tracing::{info, warn};

use crate::port::{events, Attributes, Sink};

/// Registry of sinks. Every event is delivered to each registered sink.
pub struct SinkRegistry {
    sinks: Vec<Box<dyn Sink>>,
}

impl SinkRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { sinks: vec![] }
    }

    /// Register a sink.
    pub fn register(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// Number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for SinkRegistry {
    fn record(&self, event: &str, attributes: Attributes) {
        for sink in &self.sinks {
            sink.record(event, attributes.clone());
        }
    }
}

/// A no-op sink for tests or when telemetry export is disabled.
pub struct NullSink;

impl Sink for NullSink {
    fn record(&self, _event: &str, _attributes: Attributes) {}
}

/// A sink that writes every event as a structured tracing event.
///
/// Alerts are logged at `warn`, everything else at `info`.
pub struct LogSink;

impl Sink for LogSink {
    fn record(&self, event: &str, attributes: Attributes) {
        let attributes = serde_json::to_string(&attributes).unwrap_or_default();
        if event == events::API_ALERT {
            warn!(target: "beacon::sink", event, %attributes, "Telemetry event");
        } else {
            info!(target: "beacon::sink", event, %attributes, "Telemetry event");
        }
    }
}
