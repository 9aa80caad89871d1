//! Connection manager lifecycle under scripted transports and paused time.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use beacon::config::ReconnectionConfig;
use beacon::domain::{Channel, ConnectionState, CLOSE_ABNORMAL, CLOSE_NORMAL};
use beacon::error::TransportError;
use beacon::service::{ConnectionManager, ManagerOptions};
use beacon::testkit::domain::reconnection;
use beacon::testkit::settle;
use beacon::testkit::transport::ScriptedConnector;

const URL: &str = "ws://localhost:9000/ws";

fn manager_with(connector: &Arc<ScriptedConnector>, reconnection: ReconnectionConfig) -> ConnectionManager {
    ConnectionManager::new(
        URL,
        connector.clone(),
        ManagerOptions {
            reconnection,
            ..ManagerOptions::default()
        },
    )
}

fn manager(connector: &Arc<ScriptedConnector>) -> ConnectionManager {
    manager_with(connector, reconnection())
}

#[tokio::test(start_paused = true)]
async fn backoff_schedule_doubles_then_gives_up() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.refuse_next(6);
    let manager = manager(&connector);

    let start = tokio::time::Instant::now();
    manager.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;

    let offsets: Vec<u64> = connector
        .attempt_times()
        .iter()
        .map(|t| t.duration_since(start).as_secs())
        .collect();
    // initial attempt, then 1s, 2s, 4s, 8s, 16s later
    assert_eq!(offsets, vec![0, 1, 3, 7, 15, 31]);

    assert_eq!(manager.state(), ConnectionState::Error);
    assert!(!manager.has_pending_reconnect());
    assert_eq!(manager.reconnect_attempts(), 5);
}

#[tokio::test(start_paused = true)]
async fn backoff_is_capped_at_max_delay() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.refuse_next(8);
    let manager = manager_with(
        &connector,
        ReconnectionConfig {
            max_attempts: 7,
            ..reconnection()
        },
    );

    let start = tokio::time::Instant::now();
    manager.connect();
    tokio::time::sleep(Duration::from_secs(300)).await;

    let offsets: Vec<u64> = connector
        .attempt_times()
        .iter()
        .map(|t| t.duration_since(start).as_secs())
        .collect();
    assert_eq!(offsets, vec![0, 1, 3, 7, 15, 31, 61, 91]);
}

#[tokio::test(start_paused = true)]
async fn explicit_connect_after_give_up_resets_counter() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.refuse_next(6);
    let manager = manager(&connector);

    manager.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(manager.state(), ConnectionState::Error);

    manager.connect();
    settle().await;

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.reconnect_attempts(), 0);
    assert_eq!(connector.connect_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn successful_reconnect_resets_attempts() {
    let connector = Arc::new(ScriptedConnector::new().with_results(vec![
        Err(TransportError::Timeout(10_000)),
        Err(TransportError::Handshake("HTTP status 503".into())),
    ]));
    let manager = manager(&connector);

    manager.connect();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.reconnect_attempts(), 0);
    assert_eq!(connector.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn resubscribes_each_channel_once_after_abnormal_close() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    manager.connect();
    settle().await;
    for channel in ["orders", "inventory", "orders", "sessions"] {
        manager.subscribe(channel);
    }

    let first = connector.take_link().unwrap();
    first.close(CLOSE_ABNORMAL);
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.has_pending_reconnect());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(manager.is_connected());

    let mut second = connector.take_link().unwrap();
    let sent = second.sent();
    let channels: Vec<&str> = sent
        .iter()
        .map(|m| {
            assert_eq!(m["action"], "subscribe");
            m["channel"].as_str().unwrap()
        })
        .collect();
    let distinct: BTreeSet<&str> = channels.iter().copied().collect();

    assert_eq!(channels.len(), 3);
    assert_eq!(distinct.len(), 3);
    assert_eq!(
        manager.subscriptions(),
        vec![
            Channel::from("inventory"),
            Channel::from("orders"),
            Channel::from("sessions")
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn subscribe_before_connect_is_replayed_on_open() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    manager.subscribe("orders");
    manager.ping();
    manager.connect();
    settle().await;

    let mut link = connector.take_link().unwrap();
    let sent = link.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "subscribe");
    assert_eq!(sent[0]["channel"], "orders");
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_removes_channel_from_replay() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    manager.connect();
    settle().await;
    manager.subscribe("orders");
    manager.subscribe("carts");
    manager.unsubscribe("carts");

    let mut first = connector.take_link().unwrap();
    let actions: Vec<String> = first
        .sent()
        .iter()
        .map(|m| m["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["subscribe", "subscribe", "unsubscribe"]);

    first.close(CLOSE_ABNORMAL);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut second = connector.take_link().unwrap();
    let sent = second.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["channel"], "orders");
}

#[tokio::test(start_paused = true)]
async fn normal_close_does_not_reconnect() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    manager.connect();
    settle().await;
    connector.take_link().unwrap().close(CLOSE_NORMAL);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(connector.connect_count(), 1);
    assert!(!manager.has_pending_reconnect());
}

#[tokio::test(start_paused = true)]
async fn link_error_moves_to_error_and_retries() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);
    let mut errors = manager.transport_errors();

    manager.connect();
    settle().await;
    connector
        .take_link()
        .unwrap()
        .fail(TransportError::Reset("peer reset".into()));
    settle().await;

    assert_eq!(manager.state(), ConnectionState::Error);
    assert_eq!(errors.try_recv().unwrap().error_type, "connection_reset");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(manager.is_connected());
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropped_link_counts_as_abnormal_close() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    manager.connect();
    settle().await;
    drop(connector.take_link());
    settle().await;

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.has_pending_reconnect());
    manager.disconnect();
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.refuse_next(1);
    let manager = manager(&connector);

    manager.connect();
    settle().await;
    assert!(manager.has_pending_reconnect());

    manager.disconnect();
    assert!(!manager.has_pending_reconnect());
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.connect_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_then_connect_never_leaves_two_open_links() {
    let connector = Arc::new(ScriptedConnector::new().with_delay(Duration::from_millis(100)));
    let manager = manager(&connector);

    // first attempt is still mid-handshake when we disconnect
    manager.connect();
    settle().await;
    manager.disconnect();
    manager.connect();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut links = connector.take_links();
    let open = links.iter_mut().map(|link| link.is_open()).filter(|open| *open).count();
    assert_eq!(open, 1);
    assert!(manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_link_with_normal_code() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);
    let mut states = manager.state_changes();

    manager.connect();
    settle().await;
    manager.disconnect();

    let mut link = connector.take_link().unwrap();
    assert_eq!(link.close_code(), Some(CLOSE_NORMAL));

    let seen: Vec<ConnectionState> = std::iter::from_fn(|| states.try_recv().ok()).collect();
    assert_eq!(
        seen,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn ping_only_sent_when_connected() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    manager.ping();
    manager.connect();
    settle().await;
    manager.ping();

    let mut link = connector.take_link().unwrap();
    let sent = link.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "ping");
    assert!(sent[0].get("channel").is_none());
}

#[tokio::test(start_paused = true)]
async fn resume_pings_when_connected_and_reconnects_otherwise() {
    let connector = Arc::new(ScriptedConnector::new());
    let manager = manager(&connector);

    // never connected: nothing to resume
    manager.resume();
    settle().await;
    assert_eq!(connector.connect_count(), 0);

    manager.connect();
    settle().await;
    manager.resume();
    let mut link = connector.take_link().unwrap();
    assert_eq!(link.sent()[0]["action"], "ping");

    // five scheduled attempts, all refused
    connector.refuse_next(5);
    link.close(CLOSE_ABNORMAL);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(manager.state(), ConnectionState::Error);
    assert!(!manager.has_pending_reconnect());

    manager.resume();
    settle().await;
    assert!(manager.is_connected());
}
