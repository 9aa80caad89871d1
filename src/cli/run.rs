//! Handler for the `run` command.

use std::time::Duration;

use tokio::signal;
use tokio::time::{interval_at, Instant};
use tracing::info;

use crate::app::Telemetry;
use crate::cli::{stats, RunArgs};
use crate::config::Config;
use crate::error::Result;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    // Apply CLI overrides
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    config.connection.channels.extend(args.channels.iter().cloned());

    config.init_logging();
    info!(
        config = %args.config.display(),
        channels = ?config.connection.channels,
        "beacon starting"
    );

    let telemetry = Telemetry::from_config(config)?;
    let running = telemetry.start()?;

    if args.stats_interval == 0 {
        let _ = signal::ctrl_c().await;
    } else {
        let every = Duration::from_secs(args.stats_interval);
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = signal::ctrl_c() => break,
                _ = ticker.tick() => stats::print(telemetry.aggregator()),
            }
        }
    }

    info!("Shutdown signal received");
    running.shutdown().await;
    stats::print(telemetry.aggregator());
    info!("beacon stopped");
    Ok(())
}
