//! Wire envelopes exchanged over the streaming connection.
//!
//! Inbound frames are `{ "type", "data", "timestamp" }` envelopes. The `data`
//! field is decoded into a [`TelemetryPayload`] variant selected by `type`;
//! unrecognised types keep their raw payload in [`TelemetryPayload::Unknown`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::id::Channel;
use crate::error::DecodeError;

/// Control messages sent to the telemetry backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum OutboundMessage {
    Subscribe { channel: Channel },
    Unsubscribe { channel: Channel },
    Ping,
}

impl OutboundMessage {
    /// Serialize to the JSON text frame sent on the wire.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Serializing these variants cannot fail: all fields are strings.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Category an inbound message is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    UserBehavior,
    PerformanceMetric,
    BusinessMetric,
    SystemStatus,
    ErrorNotification,
    Unknown,
}

impl MessageKind {
    /// Map a wire `type` tag to its category.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "user_behavior" => Self::UserBehavior,
            "performance_metric" => Self::PerformanceMetric,
            "business_metric" => Self::BusinessMetric,
            "system_status" => Self::SystemStatus,
            "error_notification" => Self::ErrorNotification,
            _ => Self::Unknown,
        }
    }
}

/// Field values the backend sent that have no typed counterpart.
pub type Extra = Map<String, Value>;

/// A shopper interaction reported by the storefront.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBehavior {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A client or server side performance measurement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A business KPI such as revenue or conversion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetric {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Health of a backend component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Down,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub status: Option<ComponentStatus>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An error pushed by the backend for display and alerting.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotification {
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_context: Value,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A category payload: known fields are typed, everything else lands in
/// [`Extra`].
trait Payload: DeserializeOwned + Default {
    fn extra_mut(&mut self) -> &mut Extra;

    /// Decode `data`, never failing.
    ///
    /// When a known field has an unexpected type (or `data` is not an
    /// object) the typed fields stay empty and the raw value is kept in
    /// `extra`; a non-object `data` is stored under the `data` key.
    fn lenient(kind: &str, data: Value) -> Self {
        match serde_json::from_value(data.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(kind, error = %e, "Payload does not match its typed fields, keeping it raw");
                let mut payload = Self::default();
                *payload.extra_mut() = match data {
                    Value::Object(map) => map,
                    Value::Null => Extra::new(),
                    other => Extra::from_iter([("data".to_string(), other)]),
                };
                payload
            }
        }
    }
}

macro_rules! impl_payload {
    ($($ty:ty),* $(,)?) => {
        $(impl Payload for $ty {
            fn extra_mut(&mut self) -> &mut Extra {
                &mut self.extra
            }
        })*
    };
}

impl_payload!(
    UserBehavior,
    PerformanceMetric,
    BusinessMetric,
    SystemStatus,
    ErrorNotification,
);

/// Typed `data` of an inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryPayload {
    UserBehavior(UserBehavior),
    PerformanceMetric(PerformanceMetric),
    BusinessMetric(BusinessMetric),
    SystemStatus(SystemStatus),
    ErrorNotification(ErrorNotification),
    Unknown { kind: String, data: Value },
}

impl TelemetryPayload {
    /// Decode `data` for the category selected by the wire tag `kind`.
    #[must_use]
    pub fn from_parts(kind: String, data: Value) -> Self {
        match MessageKind::from_tag(&kind) {
            MessageKind::UserBehavior => Self::UserBehavior(Payload::lenient(&kind, data)),
            MessageKind::PerformanceMetric => {
                Self::PerformanceMetric(Payload::lenient(&kind, data))
            }
            MessageKind::BusinessMetric => Self::BusinessMetric(Payload::lenient(&kind, data)),
            MessageKind::SystemStatus => Self::SystemStatus(Payload::lenient(&kind, data)),
            MessageKind::ErrorNotification => {
                Self::ErrorNotification(Payload::lenient(&kind, data))
            }
            MessageKind::Unknown => Self::Unknown { kind, data },
        }
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::UserBehavior(_) => MessageKind::UserBehavior,
            Self::PerformanceMetric(_) => MessageKind::PerformanceMetric,
            Self::BusinessMetric(_) => MessageKind::BusinessMetric,
            Self::SystemStatus(_) => MessageKind::SystemStatus,
            Self::ErrorNotification(_) => MessageKind::ErrorNotification,
            Self::Unknown { .. } => MessageKind::Unknown,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    timestamp: DateTime<Utc>,
}

/// A decoded inbound message. Immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub payload: TelemetryPayload,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Decode a raw text frame.
    ///
    /// Only the envelope can fail: `data` of a known type is always decoded
    /// into its category, with unrecognised fields kept as extras.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the frame is not a `{type, data, timestamp}`
    /// envelope.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(raw).map_err(DecodeError)?;

        Ok(Self {
            payload: TelemetryPayload::from_parts(envelope.kind, envelope.data),
            timestamp: envelope.timestamp,
        })
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}
