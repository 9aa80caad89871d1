//! Message routing end to end: scripted link -> manager -> router -> sink.

use std::sync::Arc;

use beacon::domain::{ComponentStatus, CLOSE_ABNORMAL};
use beacon::port::events;
use beacon::service::{ConnectionManager, ManagerOptions, MessageRouter};
use beacon::testkit::domain::envelope;
use beacon::testkit::settle;
use beacon::testkit::sink::RecordingSink;
use beacon::testkit::transport::ScriptedConnector;
use serde_json::json;

struct Fixture {
    connector: Arc<ScriptedConnector>,
    manager: ConnectionManager,
    router: Arc<MessageRouter>,
    sink: RecordingSink,
}

fn fixture() -> Fixture {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = ConnectionManager::new(
        "ws://localhost:9000/ws",
        connector.clone(),
        ManagerOptions::default(),
    );
    let sink = RecordingSink::new();
    let router = Arc::new(MessageRouter::new(Arc::new(sink.clone())));
    Fixture {
        connector,
        manager,
        router,
        sink,
    }
}

#[tokio::test(start_paused = true)]
async fn frames_are_dispatched_by_type_in_order() {
    let f = fixture();
    let mut performance = f.router.performance_metrics();
    let mut status = f.router.system_status();
    let handle = Arc::clone(&f.router).run(&f.manager);

    f.manager.connect();
    settle().await;
    let link = f.connector.take_link().unwrap();
    link.push_text(envelope("performance_metric", json!({"name": "ttfb", "value": 120.5, "unit": "ms"})));
    link.push_text(envelope("performance_metric", json!({"name": "lcp", "value": 2400.0})));
    link.push_text(envelope("system_status", json!({"component": "search", "status": "degraded"})));
    settle().await;

    let first = performance.try_recv().unwrap();
    let second = performance.try_recv().unwrap();
    assert_eq!(first.data.name.as_deref(), Some("ttfb"));
    assert_eq!(second.data.name.as_deref(), Some("lcp"));
    assert_eq!(first.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    assert_eq!(status.try_recv().unwrap().data.status, Some(ComponentStatus::Degraded));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_do_not_stop_routing() {
    let f = fixture();
    let mut business = f.router.business_metrics();
    let handle = Arc::clone(&f.router).run(&f.manager);

    f.manager.connect();
    settle().await;
    let link = f.connector.take_link().unwrap();
    link.push_text("not json at all");
    link.push_text(envelope("business_metric", json!({"value": "NaN"})));
    link.push_text(envelope("business_metric", json!({"name": "revenue", "value": 99.5, "currency": "EUR"})));
    settle().await;

    let mistyped = business.try_recv().unwrap();
    assert_eq!(mistyped.data.value, None);
    assert_eq!(mistyped.data.extra["value"], "NaN");
    let update = business.try_recv().unwrap();
    assert_eq!(update.data.name.as_deref(), Some("revenue"));
    assert_eq!(update.data.value, Some(99.5));
    assert!(business.try_recv().is_err());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn state_changes_and_errors_reach_the_sink() {
    let f = fixture();
    let handle = Arc::clone(&f.router).run(&f.manager);

    f.connector.refuse_next(1);
    f.manager.connect();
    settle().await;

    let errors = f.sink.events_named(events::TRANSPORT_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["errorType"], "connection_refused");
    assert!(errors[0].contains_key("message"));

    let states: Vec<String> = f
        .sink
        .events_named(events::CONNECTION_STATE)
        .iter()
        .map(|a| a["state"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(states, vec!["connecting", "error"]);

    f.sink.clear();
    f.manager.disconnect();
    settle().await;
    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, events::CONNECTION_STATE);
    assert_eq!(events[0].1["state"], "disconnected");

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn error_notifications_are_forwarded_with_capture_time() {
    let f = fixture();
    let mut notifications = f.router.error_notifications();
    let handle = Arc::clone(&f.router).run(&f.manager);

    f.manager.connect();
    settle().await;
    let link = f.connector.take_link().unwrap();
    link.push_text(envelope(
        "error_notification",
        json!({"errorType": "payment", "errorMessage": "card declined", "errorContext": {"orderId": 42}}),
    ));
    settle().await;

    assert_eq!(
        notifications.try_recv().unwrap().data.error_message.as_deref(),
        Some("card declined")
    );
    let recorded = f.sink.events_named(events::ERROR_NOTIFICATION);
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["errorType"], "payment");
    assert_eq!(recorded[0]["errorContext"]["orderId"], 42);
    // capture time, not the envelope timestamp
    assert_ne!(recorded[0]["timestamp"], "2024-03-01T12:00:00Z");

    link.close(CLOSE_ABNORMAL);
    f.manager.disconnect();
    handle.shutdown().await;
}
