//! Mock [`Connector`] for driving the connection manager in tests.
//!
//! Each successful `connect()` creates a fresh [`MockLink`]. Tests pop links
//! with [`ScriptedConnector::take_link`] and use them to inject inbound
//! frames, closes and failures, and to inspect what the manager sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::Instant;

use crate::error::TransportError;
use crate::port::{Connector, Transport, TransportCommand, TransportEvent};

/// A connector with scripted results.
///
/// Each call to `connect()` pops the next scripted result (defaults to
/// success when exhausted).
#[derive(Default)]
pub struct ScriptedConnector {
    results: Mutex<VecDeque<Result<(), TransportError>>>,
    links: Mutex<VecDeque<MockLink>>,
    attempts: Mutex<Vec<Instant>>,
    connect_count: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every connect by `delay` before resolving.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_results(self, results: Vec<Result<(), TransportError>>) -> Self {
        *self.results.lock() = results.into();
        self
    }

    /// Queue `n` refused connects ahead of any already scripted result.
    pub fn refuse_next(&self, n: usize) {
        let mut results = self.results.lock();
        for _ in 0..n {
            results.push_front(Err(TransportError::Refused("scripted".into())));
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Instants at which `connect()` was entered, in order.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    /// Pop the oldest link not yet taken.
    pub fn take_link(&self) -> Option<MockLink> {
        self.links.lock().pop_front()
    }

    /// Pop every link not yet taken.
    pub fn take_links(&self) -> Vec<MockLink> {
        self.links.lock().drain(..).collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Transport, TransportError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push(Instant::now());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.results.lock().pop_front();
        if let Some(Err(err)) = next {
            return Err(err);
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.links.lock().push_back(MockLink {
            events: events_tx,
            commands: commands_rx,
            received: Vec::new(),
            close_code: None,
            released: false,
        });

        Ok(Transport {
            commands: commands_tx,
            events: events_rx,
        })
    }
}

/// The backend side of one scripted link.
pub struct MockLink {
    events: mpsc::UnboundedSender<TransportEvent>,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
    received: Vec<TransportCommand>,
    close_code: Option<u16>,
    released: bool,
}

impl MockLink {
    /// Deliver an inbound text frame.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Text(text.into()));
    }

    /// Close the link from the backend side.
    pub fn close(&self, code: u16) {
        let _ = self.events.send(TransportEvent::Closed {
            code,
            reason: String::new(),
        });
    }

    /// Fail the link with a transport error.
    pub fn fail(&self, err: TransportError) {
        let _ = self.events.send(TransportEvent::Error(err));
    }

    /// Every command the manager sent so far.
    pub fn commands(&mut self) -> Vec<TransportCommand> {
        self.drain();
        self.received.clone()
    }

    /// Text frames the manager sent, parsed as JSON.
    pub fn sent(&mut self) -> Vec<Value> {
        self.commands()
            .into_iter()
            .filter_map(|cmd| match cmd {
                TransportCommand::Send(text) => serde_json::from_str(&text).ok(),
                TransportCommand::Close(_) => None,
            })
            .collect()
    }

    /// Close code the manager requested, if any.
    pub fn close_code(&mut self) -> Option<u16> {
        self.drain();
        self.close_code
    }

    /// True while the manager holds the link and has not asked to close it.
    pub fn is_open(&mut self) -> bool {
        self.drain();
        self.close_code.is_none() && !self.released
    }

    fn drain(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(cmd) => {
                    if let TransportCommand::Close(code) = cmd {
                        self.close_code = Some(code);
                    }
                    self.received.push(cmd);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.released = true;
                    break;
                }
            }
        }
    }
}
