use std::path::Path;

use crate::cli::output::{self, Block, Status};
use crate::config::{Config, URL_ENV};
use crate::error::Result;

/// Validate configuration file without connecting.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load(path)?;
    let url = config.connection.resolve_url()?;

    output::status(Status::Passed, "Configuration file is valid");

    let mut summary = Block::new("Summary").field("Stream URL", &url);
    if std::env::var(URL_ENV).is_ok_and(|v| !v.is_empty()) {
        summary = summary.note(format!("(from {URL_ENV})"));
    }
    summary
        .field("Channels", format!("{:?}", config.connection.channels))
        .field("Auto-reconnect", config.connection.auto_reconnect)
        .field(
            "Backoff",
            format!(
                "{} ms x{} up to {} ms, {} attempts",
                config.reconnection.initial_delay_ms,
                config.reconnection.backoff_multiplier,
                config.reconnection.max_delay_ms,
                config.reconnection.max_attempts
            ),
        )
        .field("History", config.metrics.history_capacity)
        .field("Window", format!("{} s", config.metrics.window_secs))
        .field(
            "Error rate alerts",
            format!(
                "warn {:.0}% / critical {:.0}%",
                config.alerts.error_rate_warning * 100.0,
                config.alerts.error_rate_critical * 100.0
            ),
        )
        .field("Probes", config.probes.len())
        .print();
    println!();

    if config.connection.channels.is_empty() {
        output::status(Status::Warning, "No startup channels configured");
    }
    println!("Configuration is ready to use.");

    Ok(())
}
