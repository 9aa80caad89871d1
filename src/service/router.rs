//! Inbound message routing.
//!
//! # Architecture
//!
//! ```text
//! ConnectionManager --(inbound)--> MessageRouter::route
//!                                        |
//!                                        +-- user_behavior      --> broadcast
//!                                        +-- performance_metric --> broadcast
//!                                        +-- business_metric    --> broadcast
//!                                        +-- system_status      --> broadcast
//!                                        +-- error_notification --> broadcast + Sink
//!                                        +-- unknown            --> log only
//!
//! ConnectionManager --(state / errors)--> Sink
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::attributes;
use crate::domain::{
    BusinessMetric, ConnectionState, ErrorNotification, InboundMessage, MessageKind,
    PerformanceMetric, SystemStatus, TelemetryPayload, TransportErrorEvent, UserBehavior,
};
use crate::port::{events, Sink};
use crate::service::connection::{ConnectionManager, DEFAULT_STREAM_CAPACITY};

/// A routed payload with the envelope timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Update<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

/// Dispatches decoded envelopes to one multicast stream per category.
pub struct MessageRouter {
    user_behavior: broadcast::Sender<Update<UserBehavior>>,
    performance: broadcast::Sender<Update<PerformanceMetric>>,
    business: broadcast::Sender<Update<BusinessMetric>>,
    system_status: broadcast::Sender<Update<SystemStatus>>,
    error_notifications: broadcast::Sender<Update<ErrorNotification>>,
    sink: Arc<dyn Sink>,
}

/// Handle for stopping a running router task.
pub struct RouterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RouterHandle {
    /// Signal the routing task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

impl MessageRouter {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self::with_capacity(sink, DEFAULT_STREAM_CAPACITY)
    }

    pub fn with_capacity(sink: Arc<dyn Sink>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            user_behavior: broadcast::channel(capacity).0,
            performance: broadcast::channel(capacity).0,
            business: broadcast::channel(capacity).0,
            system_status: broadcast::channel(capacity).0,
            error_notifications: broadcast::channel(capacity).0,
            sink,
        }
    }

    pub fn user_behavior(&self) -> broadcast::Receiver<Update<UserBehavior>> {
        self.user_behavior.subscribe()
    }

    pub fn performance_metrics(&self) -> broadcast::Receiver<Update<PerformanceMetric>> {
        self.performance.subscribe()
    }

    pub fn business_metrics(&self) -> broadcast::Receiver<Update<BusinessMetric>> {
        self.business.subscribe()
    }

    pub fn system_status(&self) -> broadcast::Receiver<Update<SystemStatus>> {
        self.system_status.subscribe()
    }

    pub fn error_notifications(&self) -> broadcast::Receiver<Update<ErrorNotification>> {
        self.error_notifications.subscribe()
    }

    /// Decode and dispatch one raw frame.
    ///
    /// Malformed frames are logged and dropped. Returns the category the
    /// frame was dispatched to.
    pub fn route(&self, raw: &str) -> Option<MessageKind> {
        let message = match InboundMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed inbound message");
                return None;
            }
        };

        let kind = message.kind();
        let timestamp = message.timestamp;
        trace!(?kind, %timestamp, "Routing inbound message");

        // No receivers is fine; categories nobody listens to are discarded.
        match message.payload {
            TelemetryPayload::UserBehavior(data) => {
                let _ = self.user_behavior.send(Update { data, timestamp });
            }
            TelemetryPayload::PerformanceMetric(data) => {
                let _ = self.performance.send(Update { data, timestamp });
            }
            TelemetryPayload::BusinessMetric(data) => {
                let _ = self.business.send(Update { data, timestamp });
            }
            TelemetryPayload::SystemStatus(data) => {
                let _ = self.system_status.send(Update { data, timestamp });
            }
            TelemetryPayload::ErrorNotification(data) => {
                self.sink.record(
                    events::ERROR_NOTIFICATION,
                    attributes! {
                        "errorType" => data.error_type,
                        "errorMessage" => data.error_message,
                        "errorContext" => data.error_context,
                        "timestamp" => Utc::now(),
                    },
                );
                let _ = self.error_notifications.send(Update { data, timestamp });
            }
            TelemetryPayload::Unknown { kind, .. } => {
                warn!(kind = %kind, "Unknown message type");
            }
        }

        Some(kind)
    }

    fn record_state(&self, state: ConnectionState) {
        self.sink.record(
            events::CONNECTION_STATE,
            attributes! {
                "state" => state.as_str(),
                "timestamp" => Utc::now(),
            },
        );
    }

    fn record_transport_error(&self, error: &TransportErrorEvent) {
        self.sink.record(
            events::TRANSPORT_ERROR,
            attributes! {
                "message" => error.message,
                "errorType" => error.error_type,
                "timestamp" => Utc::now(),
            },
        );
    }

    /// Start routing the manager's inbound frames and forwarding its state
    /// changes and transport errors to the sink.
    ///
    /// Receivers are subscribed before this returns, so nothing the manager
    /// publishes afterwards is missed.
    pub fn run(self: Arc<Self>, manager: &ConnectionManager) -> RouterHandle {
        let mut inbound = manager.inbound();
        let mut states = manager.state_changes();
        let mut errors = manager.transport_errors();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Message router shutting down");
                        break;
                    }

                    frame = inbound.recv() => match frame {
                        Ok(raw) => {
                            self.route(&raw);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "Router lagged, inbound frames missed");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Inbound stream closed");
                            break;
                        }
                    },

                    state = states.recv() => match state {
                        Ok(state) => self.record_state(state),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "Router lagged, state changes missed");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },

                    error = errors.recv() => match error {
                        Ok(error) => self.record_transport_error(&error),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "Router lagged, transport errors missed");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        RouterHandle { shutdown_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testkit::domain::envelope;
    use crate::testkit::sink::RecordingSink;

    fn router() -> (MessageRouter, RecordingSink) {
        let sink = RecordingSink::new();
        (MessageRouter::new(Arc::new(sink.clone())), sink)
    }

    #[test]
    fn test_routes_user_behavior() {
        let (router, _sink) = router();
        let mut rx = router.user_behavior();

        let raw = envelope(
            "user_behavior",
            json!({"action": "add_to_cart", "sessionId": "s-1"}),
        );
        assert_eq!(router.route(&raw), Some(MessageKind::UserBehavior));

        let update = rx.try_recv().unwrap();
        assert_eq!(update.data.action.as_deref(), Some("add_to_cart"));
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let (router, sink) = router();
        assert_eq!(router.route("{not json"), None);
        assert_eq!(router.route(r#"{"type":"system_status"}"#), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unknown_type_only_logs() {
        let (router, sink) = router();
        let mut errors = router.error_notifications();

        let raw = envelope("inventory_sync", json!({"sku": 1}));
        assert_eq!(router.route(&raw), Some(MessageKind::Unknown));
        assert!(errors.try_recv().is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_error_notification_reaches_sink() {
        let (router, sink) = router();
        let mut rx = router.error_notifications();

        let raw = envelope(
            "error_notification",
            json!({"errorType": "checkout", "errorMessage": "timeout", "errorContext": {"step": 3}}),
        );
        router.route(&raw);

        assert_eq!(rx.try_recv().unwrap().data.error_type.as_deref(), Some("checkout"));
        let recorded = sink.events_named(events::ERROR_NOTIFICATION);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0]["errorMessage"], "timeout");
        assert_eq!(recorded[0]["errorContext"], json!({"step": 3}));
        assert!(recorded[0].contains_key("timestamp"));
    }

    #[test]
    fn test_unexpected_data_shape_still_reaches_its_category() {
        let (router, sink) = router();
        let mut performance = router.performance_metrics();
        let mut status = router.system_status();
        let mut errors = router.error_notifications();

        let raw = envelope("performance_metric", json!({"lcp": 1200, "fid": 8}));
        assert_eq!(router.route(&raw), Some(MessageKind::PerformanceMetric));
        let update = performance.try_recv().unwrap();
        assert_eq!(update.data.name, None);
        assert_eq!(update.data.extra["lcp"], 1200);

        let raw = envelope("system_status", json!({"overall": "ok"}));
        assert_eq!(router.route(&raw), Some(MessageKind::SystemStatus));
        let update = status.try_recv().unwrap();
        assert_eq!(update.data.status, None);
        assert_eq!(update.data.extra["overall"], "ok");

        let raw = envelope("error_notification", json!({"errorType": "payment", "message": "declined"}));
        assert_eq!(router.route(&raw), Some(MessageKind::ErrorNotification));
        let update = errors.try_recv().unwrap();
        assert_eq!(update.data.error_message, None);
        assert_eq!(update.data.extra["message"], "declined");
        let recorded = sink.events_named(events::ERROR_NOTIFICATION);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0]["errorType"], "payment");
    }
}
