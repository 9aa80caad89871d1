//! Transport port for the streaming connection.
//!
//! A [`Connector`] opens one bidirectional link and hands back a pair of
//! channels: commands flow to the link, events flow back. The connection
//! manager never touches sockets directly, so tests can script the link.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Instruction for an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send a text frame.
    Send(String),
    /// Close the link with the given close code.
    Close(u16),
}

/// Something observed on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame from the backend.
    Text(String),
    /// The link closed. `code` is 1006 when no close frame was received.
    Closed { code: u16, reason: String },
    /// The link failed; no further events follow.
    Error(TransportError),
}

/// An open link returned by a [`Connector`].
#[derive(Debug)]
pub struct Transport {
    pub commands: mpsc::UnboundedSender<TransportCommand>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Transport {
    /// Ask the link to close. Dropped silently if it already went away.
    pub fn close(&self, code: u16) {
        let _ = self.commands.send(TransportCommand::Close(code));
    }
}

/// Opens transport links.
///
/// Implementations should bound the handshake with a timeout; the
/// connection manager does not impose one.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a link to `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the link cannot be established.
    async fn connect(&self, url: &str) -> Result<Transport, TransportError>;
}
