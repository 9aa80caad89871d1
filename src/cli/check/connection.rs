use std::path::Path;
use std::time::Duration;

use crate::adapter::WebSocketConnector;
use crate::cli::output::{self, Status, Step};
use crate::config::Config;
use crate::domain::CLOSE_NORMAL;
use crate::error::Result;
use crate::port::Connector;

/// Open one streaming connection and close it again.
pub async fn execute_connection<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    let url = config.connection.resolve_url()?;

    println!("Testing connection to {url}");
    println!();

    let connector = WebSocketConnector::new(Duration::from_millis(
        config.connection.connect_timeout_ms,
    ));

    let step = Step::start("Opening WebSocket");
    match connector.connect(&url).await {
        Ok(transport) => {
            step.finish(true);
            transport.close(CLOSE_NORMAL);
        }
        Err(e) => {
            step.finish(false);
            output::status(Status::Failed, &format!("Could not open {url}"));
            return Err(e.into());
        }
    }

    println!();
    output::status(Status::Passed, "Connection test passed");
    Ok(())
}
