//! Notification channels that urgent alerts are dispatched to.

pub mod console;
pub mod memory;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::alert::Alert;
use super::error::Result;

pub use console::ConsoleChannel;
pub use memory::MemoryChannel;

/// A destination for alert notifications.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel name.
    fn name(&self) -> &str;

    /// Get the channel type.
    fn channel_type(&self) -> &str;

    /// Check if the channel is enabled.
    fn is_enabled(&self) -> bool;

    /// Deliver one alert notification.
    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Named set of notification channels.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<BTreeMap<String, Arc<dyn NotificationChannel>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. A channel with the same name is replaced.
    pub fn register(&self, channel: Arc<dyn NotificationChannel>) {
        let name = channel.name().to_string();
        self.channels.write().insert(name, channel);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.channels.write().remove(name).is_some()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Snapshot of the enabled channels.
    pub fn enabled(&self) -> Vec<Arc<dyn NotificationChannel>> {
        self.channels
            .read()
            .values()
            .filter(|c| c.is_enabled())
            .cloned()
            .collect()
    }
}

/// Send `alert` to every channel, logging failures. Returns how many succeeded.
pub async fn dispatch(channels: Vec<Arc<dyn NotificationChannel>>, alert: Alert) -> usize {
    let mut delivered = 0;
    for channel in channels {
        match channel.send(&alert).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(
                    category = "alerts",
                    alert_id = %alert.id,
                    channel = channel.name(),
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
    delivered
}
