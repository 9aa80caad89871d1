//! Application layer: wires the connection, router, aggregator and probes.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────────────────┐
//!  WebSocket ────▶ │ ConnectionManager        │ ──inbound──▶ MessageRouter ──▶ typed streams
//!                  │  (reconnect, resubscribe)│ ──state/errors──────┘  │
//!                  └──────────────────────────┘                        ▼
//!  probes ──▶ InstrumentedClient ──▶ MetricsAggregator ──alerts──▶   Sink
//! ```

mod probe;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::info;

use crate::adapter::{InstrumentedClient, LogSink, SinkRegistry, WebSocketConnector};
use crate::config::Config;
use crate::error::Result;
use crate::port::{Connector, Sink};
use crate::service::{
    CleanupHandle, ConnectionManager, ManagerOptions, MessageRouter, MetricsAggregator,
    RouterHandle,
};

/// Explicitly constructed telemetry context.
///
/// Owns one connection manager, one router and one aggregator. Nothing here
/// is global; share the pieces with `Arc`/clones.
pub struct Telemetry {
    config: Config,
    manager: ConnectionManager,
    router: Arc<MessageRouter>,
    aggregator: Arc<MetricsAggregator>,
}

impl Telemetry {
    /// Build a context with explicit transport and sink.
    ///
    /// # Errors
    ///
    /// Returns an error if no streaming URL can be resolved.
    pub fn new(config: Config, connector: Arc<dyn Connector>, sink: Arc<dyn Sink>) -> Result<Self> {
        let url = config.connection.resolve_url()?;
        let manager = ConnectionManager::new(url, connector, ManagerOptions::from_config(&config));
        let router = Arc::new(MessageRouter::with_capacity(
            Arc::clone(&sink),
            config.connection.channel_capacity,
        ));
        let aggregator = Arc::new(MetricsAggregator::new(
            config.metrics.clone(),
            config.alerts.clone(),
            sink,
        ));

        Ok(Self {
            config,
            manager,
            router,
            aggregator,
        })
    }

    /// Build a production context: WebSocket transport, logging sink.
    ///
    /// # Errors
    ///
    /// Returns an error if no streaming URL can be resolved.
    pub fn from_config(config: Config) -> Result<Self> {
        Self::with_sinks(config, Vec::new())
    }

    /// Like [`Telemetry::from_config`], also delivering every event to
    /// `extra` after the logging sink.
    ///
    /// # Errors
    ///
    /// Returns an error if no streaming URL can be resolved.
    pub fn with_sinks(config: Config, extra: Vec<Box<dyn Sink>>) -> Result<Self> {
        let mut sinks = SinkRegistry::new();
        sinks.register(Box::new(LogSink));
        for sink in extra {
            sinks.register(sink);
        }

        let connector = WebSocketConnector::new(Duration::from_millis(
            config.connection.connect_timeout_ms,
        ));
        Self::new(config, Arc::new(connector), Arc::new(sinks))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn aggregator(&self) -> &Arc<MetricsAggregator> {
        &self.aggregator
    }

    /// An HTTP client recording into this context's aggregator.
    pub fn http_client(&self) -> InstrumentedClient {
        InstrumentedClient::new(Arc::clone(&self.aggregator))
    }

    /// Start routing, cleanup, heartbeat and probes, then connect.
    ///
    /// Startup channels are added to the subscription set before connecting
    /// so they go out once, on open.
    ///
    /// # Errors
    ///
    /// Returns an error if a probe is misconfigured.
    pub fn start(&self) -> Result<Running> {
        let router = Arc::clone(&self.router).run(&self.manager);
        let cleanup = self
            .aggregator
            .spawn_cleanup(self.config.metrics.cleanup_interval());

        let mut probes = Vec::with_capacity(self.config.probes.len());
        for probe_config in &self.config.probes {
            probes.push(probe::spawn(self.http_client(), probe_config.clone())?);
        }

        let heartbeat = spawn_heartbeat(
            self.manager.clone(),
            Duration::from_secs(self.config.connection.heartbeat_interval_secs),
        );

        for channel in self.config.connection.channels() {
            self.manager.subscribe(channel);
        }
        self.manager.connect();

        info!(
            url = %self.manager.url(),
            channels = self.config.connection.channels.len(),
            probes = probes.len(),
            "Telemetry started"
        );

        Ok(Running {
            manager: self.manager.clone(),
            router,
            cleanup,
            heartbeat,
            probes,
        })
    }
}

fn spawn_heartbeat(manager: ConnectionManager, every: Duration) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            ticker.tick().await;
            manager.ping();
        }
    }))
}

/// Background tasks of a started [`Telemetry`] context.
pub struct Running {
    manager: ConnectionManager,
    router: RouterHandle,
    cleanup: CleanupHandle,
    heartbeat: Option<JoinHandle<()>>,
    probes: Vec<JoinHandle<()>>,
}

impl Running {
    /// Disconnect and stop every background task.
    pub async fn shutdown(self) {
        self.manager.disconnect();
        self.cleanup.stop();
        if let Some(heartbeat) = self.heartbeat {
            heartbeat.abort();
        }
        for probe in self.probes {
            probe.abort();
        }
        self.router.shutdown().await;
        info!("Telemetry stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionState;
    use crate::port::events;
    use crate::testkit::domain::call;
    use crate::testkit::settle;
    use crate::testkit::sink::RecordingSink;
    use crate::testkit::transport::ScriptedConnector;

    fn config() -> Config {
        Config::parse_toml(
            r#"
            [connection]
            url = "ws://localhost:9000/ws"
            channels = ["orders", "inventory"]
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_connects_and_subscribes_once() {
        let connector = Arc::new(ScriptedConnector::new());
        let sink = RecordingSink::new();
        let telemetry = Telemetry::new(config(), connector.clone(), Arc::new(sink.clone())).unwrap();

        let running = telemetry.start().unwrap();
        settle().await;

        assert_eq!(telemetry.manager().state(), ConnectionState::Connected);
        let mut link = connector.take_link().unwrap();
        let sent = link.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m["action"] == "subscribe"));

        running.shutdown().await;
        assert_eq!(link.close_code(), Some(1000));
    }

    #[test]
    fn test_with_sinks_forwards_alerts_to_extra_sink() {
        let sink = RecordingSink::new();
        let telemetry = Telemetry::with_sinks(config(), vec![Box::new(sink.clone())]).unwrap();

        telemetry
            .aggregator()
            .record_call(call("GET", "/api/checkout", 200, 6000.0));

        let alerts = sink.events_named(events::API_ALERT);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["endpoint"], "/api/checkout");
    }
}
