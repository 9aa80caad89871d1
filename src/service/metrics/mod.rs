//! API call metrics: bounded history, per-endpoint aggregates and alerts.
//!
//! # Architecture
//!
//! ```text
//! InstrumentedClient / host code
//!           |
//!           v  record_call(CallOutcome)
//!   MetricsAggregator --(lock)--> history (VecDeque, bounded)
//!           |                     endpoints (HashMap<EndpointKey, EndpointStats>)
//!           |
//!           +--(after unlock)--> Sink: api_alert
//!           |
//!           +-- spawn_cleanup --> periodic window purge + rebuild
//! ```

mod aggregator;
mod percentile;
mod snapshot;

pub use aggregator::{CleanupHandle, MetricsAggregator};
pub use percentile::percentile;
pub use snapshot::{AggregateStats, AggregatorExport};
