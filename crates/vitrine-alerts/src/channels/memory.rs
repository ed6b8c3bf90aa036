//! Memory notification channel (for testing).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::NotificationChannel;
use crate::alert::Alert;
use crate::error::{Error, Result};

/// In-memory channel for testing.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    name: String,
    enabled: bool,
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl MemoryChannel {
    pub fn new(name: String) -> Self {
        Self {
            name,
            enabled: true,
            alerts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn disabled(name: String) -> Self {
        Self {
            enabled: false,
            ..Self::new(name)
        }
    }

    pub async fn get_alerts(&self) -> Vec<Alert> {
        self.alerts.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.alerts.lock().await.len()
    }
}

#[async_trait]
impl NotificationChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> &str {
        "memory"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        if !self.enabled {
            return Err(Error::ChannelDisabled(self.name.clone()));
        }
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }
}
