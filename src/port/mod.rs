//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points the core talks to. Adapters implement
//! them to integrate with real transports and observability backends.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │        Services         │
//!     ┌──────────────┤  connection · router ·  ├──────────────┐
//!     │              │  metrics                │              │
//!     │              └─────────────────────────┘              │
//!     ▼                                                       ▼
//! ┌───────────┐                                         ┌───────────┐
//! │ Transport │                                         │   Sink    │
//! │  Adapter  │                                         │  Adapter  │
//! └───────────┘                                         └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`Connector`] - Opens the streaming link (WebSocket in production)
//! - [`Sink`] - Receives derived telemetry events and alerts

mod sink;
mod transport;

pub use sink::{events, Attributes, Sink};
pub use transport::{Connector, Transport, TransportCommand, TransportEvent};
