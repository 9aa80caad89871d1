//! Transport-agnostic domain types.

mod alert;
mod connection;
mod endpoint;
mod id;
mod message;
mod metric;

pub use alert::{Alert, AlertType, Severity};
pub use connection::{ConnectionState, TransportErrorEvent, CLOSE_ABNORMAL, CLOSE_NORMAL};
pub use endpoint::stream_url;
pub use id::{Channel, TraceId};
pub use message::{
    BusinessMetric, ComponentStatus, ErrorNotification, Extra, InboundMessage, MessageKind,
    OutboundMessage, PerformanceMetric, SystemStatus, TelemetryPayload, UserBehavior,
};
pub use metric::{
    normalize_url, CallMetric, CallOutcome, EndpointKey, EndpointStats, ErrorType, HealthStatus,
};
