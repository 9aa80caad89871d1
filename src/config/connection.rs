//! Streaming connection and reconnection configuration.

use serde::Deserialize;

use crate::domain::{stream_url, Channel};
use crate::error::{ConfigError, Result};

/// Streaming connection settings.
///
/// Either `url` is given directly, or it is derived from the host
/// application's `origin` plus `path` with the scheme upgraded.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Full streaming URL (`ws://` or `wss://`).
    #[serde(default)]
    pub url: Option<String>,
    /// Host application origin, e.g. `https://shop.example.com`.
    #[serde(default)]
    pub origin: Option<String>,
    /// Path appended to the origin.
    #[serde(default = "default_path")]
    pub path: String,
    /// Channels subscribed at startup.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Reconnect automatically after abnormal closes and errors.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
    /// Interval between keepalive pings driven by the runtime.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Handshake timeout for the WebSocket connector.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Capacity of each multicast output stream.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_path() -> String {
    "/ws".into()
}

const fn default_auto_reconnect() -> bool {
    true
}

const fn default_heartbeat_interval_secs() -> u64 {
    30
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_channel_capacity() -> usize {
    1024
}

impl ConnectionConfig {
    /// Resolve the streaming URL.
    ///
    /// # Errors
    ///
    /// Returns an error when neither `url` nor `origin` is set, or the origin
    /// cannot be upgraded to a streaming scheme.
    pub fn resolve_url(&self) -> Result<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        match self.origin.as_deref().filter(|o| !o.is_empty()) {
            Some(origin) => stream_url(origin, &self.path),
            None => Err(ConfigError::MissingField { field: "connection.url" }.into()),
        }
    }

    /// Startup channels as domain values.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        self.channels.iter().map(|c| Channel::new(c.as_str())).collect()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            origin: None,
            path: default_path(),
            channels: Vec::new(),
            auto_reconnect: default_auto_reconnect(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// WebSocket reconnection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Delay before the first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Consecutive attempts before giving up and staying in `Error`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_initial_delay_ms() -> u64 {
    1000 // 1 second
}

const fn default_max_delay_ms() -> u64 {
    30_000 // 30 seconds
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_max_attempts() -> u32 {
    5
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: default_max_attempts(),
        }
    }
}
