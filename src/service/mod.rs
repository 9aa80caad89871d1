//! Core services: connection lifecycle, message routing and call metrics.

pub mod connection;
pub mod metrics;
pub mod router;

pub use connection::{backoff_delay, ConnectionManager, ManagerOptions};
pub use metrics::{AggregateStats, AggregatorExport, CleanupHandle, MetricsAggregator};
pub use router::{MessageRouter, RouterHandle, Update};
