//! Per-connection state.

use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::protocol::Outbound;

/// Subscription tag matching every alert.
pub const WILDCARD: &str = "all";

/// Logical WebSocket channel, selected by upgrade path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Alerts,
    Realtime,
    Notifications,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [Self::Alerts, Self::Realtime, Self::Notifications];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::Realtime => "realtime",
            Self::Notifications => "notifications",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Alerts => "/ws/alerts",
            Self::Realtime => "/ws/realtime",
            Self::Notifications => "/ws/notifications",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.path() == path.trim_end_matches('/'))
    }

    /// Alerts connections start subscribed to everything; the others
    /// start empty.
    pub fn default_subscriptions(&self) -> BTreeSet<String> {
        match self {
            Self::Alerts => BTreeSet::from([WILDCARD.to_string()]),
            Self::Realtime | Self::Notifications => BTreeSet::new(),
        }
    }

    /// Whether this channel handles inbound frames of `frame_type`.
    pub fn supports(&self, frame_type: &str) -> bool {
        match self {
            Self::Alerts => true,
            Self::Realtime => matches!(frame_type, "authenticate" | "subscribe" | "unsubscribe" | "ping"),
            Self::Notifications => matches!(frame_type, "authenticate" | "ping"),
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One accepted WebSocket session, as seen by the hub.
#[derive(Debug)]
pub struct Connection {
    pub id: String,
    pub channel: ChannelKind,
    pub subscriptions: BTreeSet<String>,
    pub user_id: Option<String>,
    pub roles: Vec<String>,
    /// Cleared before each heartbeat ping, set again by the pong.
    pub is_alive: bool,
    pub last_heartbeat: Instant,
    pub connected_at: Instant,
    pub messages_sent: u64,
    pub messages_received: u64,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    pub fn new(id: String, channel: ChannelKind, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        let now = Instant::now();
        Self {
            id,
            channel,
            subscriptions: channel.default_subscriptions(),
            user_id: None,
            roles: Vec::new(),
            is_alive: true,
            last_heartbeat: now,
            connected_at: now,
            messages_sent: 0,
            messages_received: 0,
            tx,
        }
    }

    /// Queue a message for the writer task. Fails once the writer is gone.
    pub fn send(&mut self, message: Outbound) -> bool {
        if self.tx.send(message).is_err() {
            return false;
        }
        self.messages_sent += 1;
        true
    }

    pub fn send_json(&mut self, frame: &serde_json::Value) -> bool {
        self.send(Outbound::Text(frame.to_string()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Whether an alert of `alert_type` matches this connection's tags.
    pub fn wants(&self, alert_type: &str) -> bool {
        self.subscriptions.contains(WILDCARD) || self.subscriptions.contains(alert_type)
    }

    pub fn snapshot(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id.clone(),
            channel: self.channel,
            subscriptions: self.subscriptions.iter().cloned().collect(),
            user_id: self.user_id.clone(),
            roles: self.roles.clone(),
            is_alive: self.is_alive,
            connected_secs: self.connected_at.elapsed().as_secs(),
            messages_sent: self.messages_sent,
            messages_received: self.messages_received,
        }
    }
}

/// Read-only view of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub id: String,
    pub channel: ChannelKind,
    pub subscriptions: Vec<String>,
    pub user_id: Option<String>,
    pub roles: Vec<String>,
    pub is_alive: bool,
    pub connected_secs: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
}
