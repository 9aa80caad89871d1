//! Configuration loading from files on disk.

use std::io::Write;

use beacon::config::Config;
use beacon::error::{ConfigError, Error};
use beacon::service::ManagerOptions;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn config_loads_full_file() {
    let file = write_temp_config(
        r#"
[connection]
url = "wss://telemetry.example.com/live"
channels = ["orders", "inventory"]
auto_reconnect = false
heartbeat_interval_secs = 0
channel_capacity = 64

[reconnection]
initial_delay_ms = 500
max_delay_ms = 8000
backoff_multiplier = 1.5
max_attempts = 3

[metrics]
history_capacity = 250
window_secs = 600
cleanup_interval_secs = 30

[alerts]
critical_response_time_ms = 2500.0

[logging]
level = "debug"
format = "json"

[[probes]]
name = "catalog"
url = "https://shop.example.com/api/products"
method = "get"
interval_secs = 15
"#,
    );

    let config = Config::load(file.path()).unwrap();

    assert_eq!(
        config.connection.resolve_url().unwrap(),
        "wss://telemetry.example.com/live"
    );
    assert_eq!(config.connection.channels().len(), 2);
    assert_eq!(config.reconnection.max_attempts, 3);
    assert_eq!(config.metrics.window().as_secs(), 600);
    assert_eq!(config.metrics.cleanup_interval().as_secs(), 30);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.probes[0].label(), "catalog");
    assert_eq!(config.probes[0].interval().as_secs(), 15);

    let options = ManagerOptions::from_config(&config);
    assert!(!options.auto_reconnect);
    assert_eq!(options.capacity, 64);
    assert_eq!(options.reconnection.initial_delay_ms, 500);
}

#[test]
fn config_rejects_max_delay_below_initial() {
    let file = write_temp_config(
        r#"
[connection]
url = "ws://localhost:9000/ws"

[reconnection]
initial_delay_ms = 5000
max_delay_ms = 1000
"#,
    );

    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "max_delay_ms",
            ..
        })) => {}
        Err(err) => panic!("Expected max_delay_ms error, got {err}"),
        Ok(_) => panic!("Expected inverted delays to be rejected"),
    }
}

#[test]
fn config_rejects_unknown_probe_method() {
    let file = write_temp_config(
        r#"
[connection]
url = "ws://localhost:9000/ws"

[[probes]]
url = "https://shop.example.com/api/products"
method = "FETCH IT"
"#,
    );

    assert!(matches!(
        Config::load(file.path()),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "probes.method",
            ..
        }))
    ));
}

#[test]
fn config_rejects_unsupported_origin_scheme() {
    let file = write_temp_config(
        r#"
[connection]
origin = "ftp://shop.example.com"
"#,
    );

    assert!(matches!(
        Config::load(file.path()),
        Err(Error::UnsupportedScheme(scheme)) if scheme == "ftp"
    ));
}

#[test]
fn config_reports_parse_errors() {
    let file = write_temp_config("[connection\nurl = ");

    assert!(matches!(
        Config::load(file.path()),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn config_reports_missing_file() {
    assert!(matches!(
        Config::load("/nonexistent/beacon.toml"),
        Err(Error::Config(ConfigError::ReadFile(_)))
    ));
}
