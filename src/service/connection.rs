//! Streaming connection lifecycle.
//!
//! [`ConnectionManager`] owns one logical connection to the telemetry
//! backend. It opens links through a [`Connector`], replays channel
//! subscriptions after every (re)connect and reconnects with exponential
//! backoff after abnormal closes and transport errors.
//!
//! # State machine
//!
//! ```text
//!   Disconnected ──connect()──▶ Connecting ──open──▶ Connected
//!        ▲  ▲                       │                    │
//!        │  └──── close(≠1000) ◀────┴──── close(≠1000) ──┤
//!        │        (reconnect)                            │
//!        └──────────── close(1000) / disconnect() ◀──────┤
//!                                                        │
//!   Error ◀──────────── transport error (reconnect) ◀────┘
//! ```
//!
//! Every connection attempt carries a generation number. Results and link
//! events from an older generation are discarded, and a stale link that
//! still opens is closed immediately, so at most one link is ever live.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, ReconnectionConfig};
use crate::domain::{
    Channel, ConnectionState, OutboundMessage, TransportErrorEvent, CLOSE_ABNORMAL, CLOSE_NORMAL,
};
use crate::error::TransportError;
use crate::port::{Connector, Transport, TransportCommand, TransportEvent};

/// Default capacity of each multicast output stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 1024;

/// Construction options for a [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub reconnection: ReconnectionConfig,
    /// Reconnect after abnormal closes and transport errors.
    pub auto_reconnect: bool,
    /// Capacity of the state, error and inbound broadcast channels.
    pub capacity: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            reconnection: ReconnectionConfig::default(),
            auto_reconnect: true,
            capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

impl ManagerOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            reconnection: config.reconnection.clone(),
            auto_reconnect: config.connection.auto_reconnect,
            capacity: config.connection.channel_capacity,
        }
    }
}

/// Delay before reconnection attempt `attempt` (1-indexed).
///
/// `min(initial * multiplier^(attempt-1), max)`, without jitter.
#[must_use]
pub fn backoff_delay(policy: &ReconnectionConfig, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let delay = policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let capped = delay.min(policy.max_delay_ms as f64);
    Duration::from_millis(capped as u64)
}

/// Handle to one logical streaming connection.
///
/// Cloning is cheap; all clones drive the same connection. Operations that
/// start work (`connect`, `resume`) spawn tasks and must be called from
/// within a Tokio runtime.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    url: String,
    connector: Arc<dyn Connector>,
    policy: ReconnectionConfig,
    auto_reconnect: bool,
    inner: Mutex<Inner>,
    state_tx: broadcast::Sender<ConnectionState>,
    error_tx: broadcast::Sender<TransportErrorEvent>,
    inbound_tx: broadcast::Sender<String>,
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    subscriptions: BTreeSet<Channel>,
    /// Whether reconnection is still desired. Cleared by `disconnect()` and
    /// by a normal close.
    should_reconnect: bool,
    /// Consecutive reconnection attempts scheduled since the last open.
    attempts: u32,
    generation: u64,
    link: Option<mpsc::UnboundedSender<TransportCommand>>,
    attempt_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>, connector: Arc<dyn Connector>, options: ManagerOptions) -> Self {
        let capacity = options.capacity.max(1);
        let (state_tx, _) = broadcast::channel(capacity);
        let (error_tx, _) = broadcast::channel(capacity);
        let (inbound_tx, _) = broadcast::channel(capacity);

        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                connector,
                policy: options.reconnection,
                auto_reconnect: options.auto_reconnect,
                inner: Mutex::new(Inner::default()),
                state_tx,
                error_tx,
                inbound_tx,
            }),
        }
    }

    /// Start connecting unless a connection is already open or in progress.
    ///
    /// An explicit connect re-enables auto-reconnect, cancels any pending
    /// reconnection and resets the attempt counter.
    pub fn connect(&self) {
        let mut inner = self.shared.inner.lock();
        if matches!(
            inner.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(state = %inner.state, "Connect ignored, already active");
            return;
        }

        inner.should_reconnect = self.shared.auto_reconnect;
        inner.attempts = 0;
        if let Some(task) = inner.reconnect_task.take() {
            task.abort();
        }
        self.shared.start_attempt(&mut inner);
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Pending attempts are cancelled before this returns; an attempt that
    /// was mid-handshake can never surface a live link afterwards.
    pub fn disconnect(&self) {
        let mut inner = self.shared.inner.lock();
        inner.should_reconnect = false;
        inner.generation += 1;

        let tasks = [
            inner.attempt_task.take(),
            inner.reconnect_task.take(),
            inner.reader_task.take(),
        ];
        for task in tasks.into_iter().flatten() {
            task.abort();
        }

        if let Some(link) = inner.link.take() {
            let _ = link.send(TransportCommand::Close(CLOSE_NORMAL));
        }
        self.shared.transition(&mut inner, ConnectionState::Disconnected);
    }

    /// Add `channel` to the subscription set.
    ///
    /// The `subscribe` message goes out immediately only when connected;
    /// otherwise it is replayed on the next open.
    pub fn subscribe(&self, channel: impl Into<Channel>) {
        let channel = channel.into();
        let mut inner = self.shared.inner.lock();
        inner.subscriptions.insert(channel.clone());
        Shared::send_if_connected(&inner, &OutboundMessage::Subscribe { channel });
    }

    /// Remove `channel` from the subscription set.
    pub fn unsubscribe(&self, channel: impl Into<Channel>) {
        let channel = channel.into();
        let mut inner = self.shared.inner.lock();
        inner.subscriptions.remove(&channel);
        Shared::send_if_connected(&inner, &OutboundMessage::Unsubscribe { channel });
    }

    /// Send a keepalive ping. Dropped when not connected.
    pub fn ping(&self) {
        let inner = self.shared.inner.lock();
        Shared::send_if_connected(&inner, &OutboundMessage::Ping);
    }

    /// Host application became visible again.
    ///
    /// Pings an open connection; otherwise reconnects if reconnection is
    /// still wanted. This also revives a manager that gave up.
    pub fn resume(&self) {
        let (state, wanted) = {
            let inner = self.shared.inner.lock();
            (inner.state, inner.should_reconnect)
        };

        match state {
            ConnectionState::Connected => self.ping(),
            ConnectionState::Connecting => {}
            _ if wanted => {
                info!(state = %state, "Resuming connection");
                self.connect();
            }
            _ => debug!(state = %state, "Resume ignored, reconnection not wanted"),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Snapshot of the subscription set, sorted by name.
    pub fn subscriptions(&self) -> Vec<Channel> {
        self.shared.inner.lock().subscriptions.iter().cloned().collect()
    }

    /// Consecutive reconnection attempts scheduled since the last open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().attempts
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.shared.inner.lock().reconnect_task.is_some()
    }

    /// Stream of every state transition.
    pub fn state_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Stream of transport errors.
    pub fn transport_errors(&self) -> broadcast::Receiver<TransportErrorEvent> {
        self.shared.error_tx.subscribe()
    }

    /// Stream of raw inbound text frames, in transport order.
    pub fn inbound(&self) -> broadcast::Receiver<String> {
        self.shared.inbound_tx.subscribe()
    }
}

impl Shared {
    fn transition(&self, inner: &mut Inner, next: ConnectionState) {
        if inner.state == next {
            return;
        }
        info!(from = %inner.state, to = %next, "Connection state changed");
        inner.state = next;
        let _ = self.state_tx.send(next);
    }

    fn send_if_connected(inner: &Inner, message: &OutboundMessage) {
        match (&inner.link, inner.state) {
            (Some(link), ConnectionState::Connected) => {
                if link.send(TransportCommand::Send(message.to_json())).is_err() {
                    debug!("Link gone, outbound message dropped");
                }
            }
            _ => debug!(state = %inner.state, "Not connected, outbound message dropped"),
        }
    }

    fn start_attempt(self: &Arc<Self>, inner: &mut Inner) {
        inner.generation += 1;
        let generation = inner.generation;
        self.transition(inner, ConnectionState::Connecting);

        info!(url = %self.url, generation, "Connecting");
        let shared = Arc::clone(self);
        inner.attempt_task = Some(tokio::spawn(async move {
            let result = shared.connector.connect(&shared.url).await;
            shared.on_connect_result(generation, result);
        }));
    }

    fn on_connect_result(self: &Arc<Self>, generation: u64, result: Result<Transport, TransportError>) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            if let Ok(transport) = result {
                debug!(generation, "Closing link from stale attempt");
                transport.close(CLOSE_NORMAL);
            }
            return;
        }
        inner.attempt_task = None;

        let transport = match result {
            Ok(transport) => transport,
            Err(err) => {
                self.handle_error(&mut inner, &err);
                return;
            }
        };

        let Transport { commands, events } = transport;
        inner.attempts = 0;
        inner.link = Some(commands.clone());
        self.transition(&mut inner, ConnectionState::Connected);

        for channel in &inner.subscriptions {
            let message = OutboundMessage::Subscribe {
                channel: channel.clone(),
            };
            let _ = commands.send(TransportCommand::Send(message.to_json()));
        }
        if !inner.subscriptions.is_empty() {
            info!(channels = inner.subscriptions.len(), "Resubscribed channels");
        }

        let shared = Arc::clone(self);
        inner.reader_task = Some(tokio::spawn(shared.read_loop(generation, events)));
    }

    async fn read_loop(
        self: Arc<Self>,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Text(text) => {
                    let _ = self.inbound_tx.send(text);
                }
                TransportEvent::Closed { code, reason } => {
                    self.on_closed(generation, code, &reason);
                    return;
                }
                TransportEvent::Error(err) => {
                    self.on_link_error(generation, &err);
                    return;
                }
            }
        }
        self.on_closed(generation, CLOSE_ABNORMAL, "link dropped");
    }

    fn on_closed(self: &Arc<Self>, generation: u64, code: u16, reason: &str) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.link = None;
        inner.reader_task = None;

        if code == CLOSE_NORMAL {
            info!(code, reason, "Connection closed normally");
            inner.should_reconnect = false;
            self.transition(&mut inner, ConnectionState::Disconnected);
            return;
        }

        warn!(code, reason, "Connection closed abnormally");
        self.transition(&mut inner, ConnectionState::Disconnected);
        if inner.should_reconnect {
            self.schedule_reconnect(&mut inner);
        }
    }

    fn on_link_error(self: &Arc<Self>, generation: u64, err: &TransportError) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.reader_task = None;
        self.handle_error(&mut inner, err);
    }

    fn handle_error(self: &Arc<Self>, inner: &mut Inner, err: &TransportError) {
        warn!(error = %err, error_type = err.kind(), "Transport error");
        let _ = self.error_tx.send(TransportErrorEvent {
            message: err.to_string(),
            error_type: err.kind().to_string(),
        });

        inner.link = None;
        self.transition(inner, ConnectionState::Error);
        if inner.should_reconnect {
            self.schedule_reconnect(inner);
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner) {
        if inner.reconnect_task.is_some() {
            return;
        }
        if inner.attempts >= self.policy.max_attempts {
            warn!(
                attempts = inner.attempts,
                "Reconnection attempts exhausted, giving up"
            );
            self.transition(inner, ConnectionState::Error);
            return;
        }

        inner.attempts += 1;
        let attempt = inner.attempts;
        let delay = backoff_delay(&self.policy, attempt);
        let generation = inner.generation;
        info!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnection"
        );

        let shared = Arc::clone(self);
        inner.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire_reconnect(generation);
        }));
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock();
        inner.reconnect_task = None;
        if inner.generation != generation || !inner.should_reconnect {
            return;
        }
        if matches!(
            inner.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return;
        }
        self.start_attempt(&mut inner);
    }
}
