//! Connection lifecycle types.

use std::fmt;

use serde::Serialize;

/// WebSocket close code for a normal, caller-initiated closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the link dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Current state of the streaming connection.
///
/// There is exactly one current value per connection manager and it only
/// changes through internal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport error observed by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportErrorEvent {
    pub message: String,
    /// Machine-readable category, e.g. `connection_refused`.
    pub error_type: String,
}
