//! WebSocket frame formats.
//!
//! Every frame is a JSON object with a `type` field. Outbound frames also
//! carry an ISO-8601 `timestamp`.

use serde::Deserialize;
use serde_json::{json, Value};

use vitrine_alerts::{Alert, AlertEventKind, AlertMetrics};

use crate::config::WsMode;

/// Inbound frame types, as they appear on the wire.
pub const INBOUND_TYPES: &[&str] = &[
    "authenticate",
    "subscribe",
    "unsubscribe",
    "get_active_alerts",
    "get_metrics",
    "ping",
];

/// A parsed client frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Authenticate {
        #[serde(default)]
        token: Option<String>,
    },
    Subscribe {
        #[serde(default)]
        subscriptions: Vec<String>,
    },
    Unsubscribe {
        #[serde(default)]
        subscriptions: Vec<String>,
    },
    GetActiveAlerts,
    GetMetrics,
    Ping,
}

impl InboundFrame {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::GetActiveAlerts => "get_active_alerts",
            Self::GetMetrics => "get_metrics",
            Self::Ping => "ping",
        }
    }
}

/// A frame the hub could not act on. Reported back as an error frame; the
/// connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Format de message invalide")]
    InvalidFormat,

    #[error("Type de message non supporté: {0}")]
    UnsupportedType(String),
}

/// Parse one text frame.
pub fn parse_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::InvalidFormat)?;
    let frame_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::InvalidFormat)?;

    if !INBOUND_TYPES.contains(&frame_type) {
        return Err(ProtocolError::UnsupportedType(frame_type.to_string()));
    }
    serde_json::from_value(value).map_err(|_| ProtocolError::InvalidFormat)
}

/// Message queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Ping,
    Close,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Stamp `frame` with its type and the current time.
fn envelope(frame_type: &str, mut frame: Value) -> Value {
    frame["type"] = Value::String(frame_type.to_string());
    frame["timestamp"] = Value::String(now());
    frame
}

pub fn connection_established(client_id: &str, channel: &str) -> Value {
    envelope(
        "connection_established",
        json!({ "clientId": client_id, "channel": channel }),
    )
}

pub fn active_alerts(alerts: &[Alert]) -> Value {
    envelope(
        "active_alerts",
        json!({ "data": alerts, "count": alerts.len() }),
    )
}

pub fn metrics(metrics: &AlertMetrics) -> Value {
    envelope("metrics", json!({ "data": metrics }))
}

pub fn alert_event(kind: AlertEventKind, alert: &Alert) -> Value {
    envelope(kind.as_str(), json!({ "data": alert }))
}

pub fn notification(alert: &Alert) -> Value {
    envelope(
        "notification",
        json!({
            "data": {
                "alertId": alert.id,
                "title": alert.title,
                "message": alert.message,
                "priority": alert.priority,
                "alertType": alert.alert_type,
            }
        }),
    )
}

pub fn realtime(topic: &str, data: &Value) -> Value {
    envelope("realtime", json!({ "topic": topic, "data": data }))
}

pub fn authenticated(mode: WsMode, user_id: &str, roles: &[String]) -> Value {
    let frame_type = match mode {
        WsMode::Dedicated => "authentication_success",
        WsMode::Unified => "authenticated",
    };
    envelope(frame_type, json!({ "userId": user_id, "roles": roles }))
}

pub fn auth_error(mode: WsMode, message: &str) -> Value {
    let frame_type = match mode {
        WsMode::Dedicated => "auth_error",
        WsMode::Unified => "error",
    };
    envelope(frame_type, json!({ "message": message }))
}

pub fn error(message: &str) -> Value {
    envelope("error", json!({ "message": message }))
}

pub fn subscription_updated(subscriptions: &[String]) -> Value {
    envelope(
        "subscription_updated",
        json!({ "subscriptions": subscriptions }),
    )
}

pub fn pong() -> Value {
    envelope("pong", json!({}))
}
