//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - `ScriptedConnector` and the `MockLink` handle used to
//!   drive a fake streaming link frame by frame.
//! - [`sink`] - `RecordingSink` for asserting emitted telemetry events.
//! - [`domain`] - Builders for envelopes, call outcomes and configs.

pub mod domain;
pub mod sink;
pub mod transport;

/// Let spawned tasks run until they block.
///
/// Works on the current-thread runtime used by `#[tokio::test]`.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
