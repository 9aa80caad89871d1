//! Endpoint statistics tables.

use tabled::{Table, Tabled};

use crate::cli::output::Block;
use crate::domain::EndpointStats;
use crate::service::{AggregateStats, MetricsAggregator};

#[derive(Tabled)]
struct EndpointRow {
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Calls")]
    calls: u64,
    #[tabled(rename = "Errors")]
    errors: u64,
    #[tabled(rename = "Error Rate")]
    error_rate: String,
    #[tabled(rename = "Avg ms")]
    avg: String,
    #[tabled(rename = "P95 ms")]
    p95: String,
    #[tabled(rename = "P99 ms")]
    p99: String,
}

impl From<&EndpointStats> for EndpointRow {
    fn from(stats: &EndpointStats) -> Self {
        Self {
            method: stats.method.clone(),
            endpoint: stats.endpoint.clone(),
            calls: stats.total_calls,
            errors: stats.error_count,
            error_rate: format!("{:.1}%", stats.error_rate * 100.0),
            avg: format!("{:.1}", stats.avg_response_time),
            p95: format!("{:.1}", stats.p95_response_time),
            p99: format!("{:.1}", stats.p99_response_time),
        }
    }
}

/// Render endpoint aggregates as a table.
pub fn endpoint_table(stats: &[EndpointStats]) -> String {
    Table::new(stats.iter().map(EndpointRow::from)).to_string()
}

/// Lay out the window summary and, when any calls were seen, the
/// per-endpoint table.
pub fn snapshot_block(aggregator: &MetricsAggregator) -> Block {
    let summary: AggregateStats = aggregator.current_stats(aggregator.window());
    let block = Block::new(format!("API metrics ({})", aggregator.health()))
        .field("Window", format!("{} min", summary.window_secs / 60))
        .field("Calls", summary.total_calls)
        .field("Error rate", format!("{:.1}%", summary.error_rate * 100.0))
        .field(
            "p50 / p95 / p99",
            format!(
                "{:.1} / {:.1} / {:.1} ms",
                summary.p50_response_time, summary.p95_response_time, summary.p99_response_time
            ),
        )
        .field("Calls/min", format!("{:.2}", summary.calls_per_minute));

    let endpoints = aggregator.all_endpoint_stats();
    if endpoints.is_empty() {
        block
    } else {
        block.table(&endpoint_table(&endpoints))
    }
}

/// Print the current snapshot.
pub fn print(aggregator: &MetricsAggregator) {
    snapshot_block(aggregator).print();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapter::NullSink;
    use crate::config::{AlertThresholds, MetricsConfig};
    use crate::testkit::domain::call;

    #[test]
    fn test_endpoint_table_has_a_row_per_endpoint() {
        let aggregator =
            MetricsAggregator::new(MetricsConfig::default(), AlertThresholds::default(), Arc::new(NullSink));
        aggregator.record_call(call("GET", "/api/products", 200, 120.0));
        aggregator.record_call(call("POST", "/api/cart", 500, 80.0));

        let table = endpoint_table(&aggregator.all_endpoint_stats());
        assert!(table.contains("Error Rate"));
        assert!(table.contains("/api/products"));
        assert!(table.contains("100.0%"));
    }

    #[test]
    fn test_empty_snapshot_has_no_table() {
        let aggregator =
            MetricsAggregator::new(MetricsConfig::default(), AlertThresholds::default(), Arc::new(NullSink));
        let rendered = snapshot_block(&aggregator).render();
        assert!(rendered.starts_with("API metrics (healthy)"));
        assert!(!rendered.contains("Endpoint"));

        aggregator.record_call(call("GET", "/api/products", 200, 120.0));
        assert!(snapshot_block(&aggregator).render().contains("/api/products"));
    }
}
