//! Sink port for derived telemetry events.
//!
//! The sink is the observability/alerting collaborator that receives
//! connection-state changes, transport errors, error notifications and
//! API alerts produced by the core.

use std::collections::BTreeMap;

use serde_json::Value;

/// Key-value payload of a sink event.
pub type Attributes = BTreeMap<String, Value>;

/// Event names emitted by the core.
pub mod events {
    pub const CONNECTION_STATE: &str = "websocket_connection_state";
    pub const TRANSPORT_ERROR: &str = "websocket_error";
    pub const ERROR_NOTIFICATION: &str = "websocket_error_notification";
    pub const API_ALERT: &str = "api_alert";
}

/// Trait for event sinks.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - `record` returns nothing; failures stay inside the sink
/// - It should return quickly; spawn a task for slow I/O
pub trait Sink: Send + Sync {
    /// Accept a named event with its attributes.
    fn record(&self, event: &str, attributes: Attributes);
}

/// Build an [`Attributes`] map from `key => value` pairs.
#[macro_export]
macro_rules! attributes {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::port::Attributes::new();
        $( map.insert(($key).to_string(), ::serde_json::json!($value)); )*
        map
    }};
}
