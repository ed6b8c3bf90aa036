//! Alert lifecycle events.
//!
//! The registry publishes every transition on a broadcast channel; the
//! WebSocket hub and any other observer subscribe to it.

use serde::Serialize;
use tokio::sync::broadcast;

use super::alert::Alert;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Lifecycle transition carried by an [`AlertEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEventKind {
    AlertCreated,
    AlertAcknowledged,
    AlertResolved,
    AlertEscalated,
}

impl AlertEventKind {
    /// Wire name, also used as the outbound frame type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlertCreated => "alert_created",
            Self::AlertAcknowledged => "alert_acknowledged",
            Self::AlertResolved => "alert_resolved",
            Self::AlertEscalated => "alert_escalated",
        }
    }
}

impl std::fmt::Display for AlertEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lifecycle event with a snapshot of the alert after the transition.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    pub alert: Alert,
}

/// Broadcast bus for alert events.
#[derive(Clone)]
pub struct AlertEventBus {
    tx: broadcast::Sender<AlertEvent>,
}

impl AlertEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// The capacity bounds how many events a slow subscriber may fall behind.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event. Returns `true` if at least one subscriber got it.
    pub fn publish(&self, kind: AlertEventKind, alert: &Alert) -> bool {
        self.tx
            .send(AlertEvent {
                kind,
                alert: alert.clone(),
            })
            .is_ok()
    }

    pub fn subscribe(&self) -> AlertEventReceiver {
        AlertEventReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for AlertEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of the alert event bus.
pub struct AlertEventReceiver {
    rx: broadcast::Receiver<AlertEvent>,
}

impl AlertEventReceiver {
    /// Receive the next event. Returns `None` once the bus is gone.
    ///
    /// A lagging receiver skips the events it missed and keeps going.
    pub async fn recv(&mut self) -> Option<AlertEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(category = "alerts", skipped, "Alert event receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Option<AlertEvent> {
        self.rx.try_recv().ok()
    }
}
