//! Periodic HTTP probes through the instrumented client.

use reqwest::Method;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::adapter::InstrumentedClient;
use crate::config::ProbeConfig;
use crate::error::{ConfigError, Result};

/// Spawn a task that calls `probe.url` every `probe.interval_secs`.
///
/// The first call happens immediately. Each call is recorded by the client's
/// aggregator; failures are logged and the loop continues.
///
/// # Errors
///
/// Returns an error if the probe's method is not a valid HTTP method.
pub fn spawn(client: InstrumentedClient, probe: ProbeConfig) -> Result<JoinHandle<()>> {
    let method = Method::from_bytes(probe.method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        ConfigError::InvalidValue {
            field: "probes.method",
            reason: format!("'{}' is not a valid HTTP method", probe.method),
        }
    })?;

    Ok(tokio::spawn(async move {
        let mut ticker = interval(probe.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match client.execute(method.clone(), &probe.url, None).await {
                Ok(response) => {
                    debug!(probe = probe.label(), status = %response.status(), "Probe completed");
                }
                Err(e) => {
                    warn!(probe = probe.label(), error = %e, "Probe failed");
                }
            }
        }
    }))
}
