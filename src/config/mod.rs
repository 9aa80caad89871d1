//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Every section has defaults, so
//! a file containing only `[connection] url = "..."` is valid. The
//! `BEACON_URL` environment variable overrides the streaming URL.
//!
//! # Example
//!
//! ```no_run
//! use beacon::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("beacon.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use serde::Deserialize;
use std::path::Path;

mod connection;
mod logging;
mod metrics;

pub use connection::{ConnectionConfig, ReconnectionConfig};
pub use logging::LoggingConfig;
pub use metrics::{AlertThresholds, MetricsConfig, ProbeConfig};

use crate::error::{ConfigError, Result};

/// Environment variable overriding `connection.url`.
pub const URL_ENV: &str = "BEACON_URL";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Streaming connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Backoff and give-up policy for reconnection.
    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    /// Aggregator history, window and cleanup settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Alert thresholds for recorded calls.
    #[serde(default)]
    pub alerts: AlertThresholds,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP endpoints polled through the instrumented client.
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(url) = std::env::var(URL_ENV) {
            if !url.is_empty() {
                config.connection.url = Some(url);
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.connection.resolve_url()?;

        if self.connection.channel_capacity == 0 {
            return Err(invalid("channel_capacity", "must be greater than 0"));
        }
        if self.connection.connect_timeout_ms == 0 {
            return Err(invalid("connect_timeout_ms", "must be greater than 0"));
        }

        let reconnection = &self.reconnection;
        if reconnection.initial_delay_ms == 0 {
            return Err(invalid("initial_delay_ms", "must be greater than 0"));
        }
        if reconnection.max_delay_ms < reconnection.initial_delay_ms {
            return Err(invalid("max_delay_ms", "must be >= initial_delay_ms"));
        }
        if reconnection.backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier", "must be >= 1.0"));
        }

        if self.metrics.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be greater than 0"));
        }
        if self.metrics.window_secs == 0 {
            return Err(invalid("window_secs", "must be greater than 0"));
        }
        if self.metrics.cleanup_interval_secs == 0 {
            return Err(invalid("cleanup_interval_secs", "must be greater than 0"));
        }

        let alerts = &self.alerts;
        if !(0.0..=1.0).contains(&alerts.error_rate_warning)
            || !(0.0..=1.0).contains(&alerts.error_rate_critical)
        {
            return Err(invalid("error_rate", "thresholds must be between 0 and 1"));
        }
        if alerts.error_rate_warning > alerts.error_rate_critical {
            return Err(invalid(
                "error_rate_warning",
                "must be <= error_rate_critical",
            ));
        }
        if alerts.critical_response_time_ms <= 0.0 {
            return Err(invalid("critical_response_time_ms", "must be greater than 0"));
        }

        for probe in &self.probes {
            if probe.url.is_empty() {
                return Err(ConfigError::MissingField { field: "probes.url" }.into());
            }
            if reqwest::Method::from_bytes(probe.method.to_ascii_uppercase().as_bytes()).is_err() {
                return Err(invalid("probes.method", "not a valid HTTP method"));
            }
            if probe.interval_secs == 0 {
                return Err(invalid("probes.interval_secs", "must be greater than 0"));
            }
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}
