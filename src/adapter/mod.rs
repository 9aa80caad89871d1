//! Implementations of ports (hexagonal adapters).

pub mod http;
pub mod sink;
pub mod websocket;

pub use http::{InstrumentedClient, TRACE_HEADER};
pub use sink::{LogSink, NullSink, SinkRegistry};
pub use websocket::WebSocketConnector;
