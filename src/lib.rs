//! Beacon - real-time telemetry client.
//!
//! Keeps one streaming connection to a telemetry backend alive (reconnect
//! with exponential backoff, channel re-subscription), routes inbound
//! envelopes to typed streams, and aggregates outbound API-call
//! measurements into per-endpoint statistics with threshold alerts.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **`domain`** - Wire envelopes, connection states, call metrics, alerts
//! - **`port`** - `Connector` (transport) and `Sink` (telemetry events)
//! - **`service`** - `ConnectionManager`, `MessageRouter`, `MetricsAggregator`
//! - **`adapter`** - WebSocket transport, sinks, instrumented HTTP client
//! - **`app`** - `Telemetry` context wiring everything from [`config::Config`]
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Transport-agnostic types
//! - [`error`] - Error types for the crate
//! - [`cli`] - Command-line interface for the `beacon` binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use beacon::adapter::{LogSink, WebSocketConnector};
//! use beacon::service::{ConnectionManager, ManagerOptions, MessageRouter};
//!
//! # async fn demo() {
//! let connector = Arc::new(WebSocketConnector::new(std::time::Duration::from_secs(10)));
//! let manager = ConnectionManager::new("wss://shop.example.com/ws", connector, ManagerOptions::default());
//! let router = Arc::new(MessageRouter::new(Arc::new(LogSink)));
//!
//! let _routing = Arc::clone(&router).run(&manager);
//! manager.subscribe("orders");
//! manager.connect();
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
pub mod service;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
