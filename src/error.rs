use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Transport-level failures reported by a [`Connector`](crate::port::Connector).
///
/// These never cross the connection manager's public boundary; they drive the
/// reconnect policy and are surfaced as `websocket_error` events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("connection reset: {0}")]
    Reset(String),
}

impl TransportError {
    /// Short machine-readable label used as the `errorType` attribute.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Refused(_) => "connection_refused",
            Self::Timeout(_) => "timeout",
            Self::Handshake(_) => "handshake",
            Self::Reset(_) => "connection_reset",
        }
    }
}

/// Raised when an inbound frame is not a `{type, data, timestamp}` envelope.
#[derive(Error, Debug)]
#[error("malformed envelope: {0}")]
pub struct DecodeError(#[source] pub serde_json::Error);

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_kind_labels() {
        assert_eq!(TransportError::Refused("x".into()).kind(), "connection_refused");
        assert_eq!(TransportError::Timeout(10).kind(), "timeout");
        assert_eq!(TransportError::Reset("x".into()).kind(), "connection_reset");
    }

    #[test]
    fn test_config_error_converts_into_error() {
        let err: Error = ConfigError::MissingField { field: "url" }.into();
        assert_eq!(err.to_string(), "missing required field: url");
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout(1500);
        assert_eq!(err.to_string(), "connection timed out after 1500 ms");
    }
}
