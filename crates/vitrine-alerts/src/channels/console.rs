//! Console notification channel.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;

use super::NotificationChannel;
use crate::alert::Alert;
use crate::error::{Error, Result};

/// Writes urgent alerts to stdout as one block per alert.
#[derive(Debug, Clone)]
pub struct ConsoleChannel {
    name: String,
    enabled: bool,
    include_details: bool,
}

impl ConsoleChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            include_details: true,
        }
    }

    /// Also print the alert's `data` and owning user.
    pub fn with_details(mut self, include: bool) -> Self {
        self.include_details = include;
        self
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// The block printed for `alert`.
    pub fn render(&self, alert: &Alert) -> String {
        let descriptor = alert.alert_type.descriptor();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "[{}] {} {} ({})",
            alert.priority.as_str().to_uppercase(),
            descriptor.icon,
            descriptor.name,
            alert.id
        );
        let _ = writeln!(out, "  {} | {}", alert.created_at.format("%Y-%m-%d %H:%M:%S"), alert.source);
        let _ = writeln!(out, "  {}", alert.title);
        let _ = writeln!(out, "  {}", alert.message);

        if self.include_details {
            if let Some(user_id) = &alert.user_id {
                let _ = writeln!(out, "  utilisateur: {}", user_id);
            }
            if !alert.data.is_empty() {
                let data = serde_json::Value::Object(alert.data.clone());
                let _ = writeln!(out, "  données: {}", data);
            }
        }
        out
    }
}

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> &str {
        "console"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        if !self.enabled {
            return Err(Error::ChannelDisabled(self.name.clone()));
        }

        // One write per block so concurrent dispatches don't interleave.
        let block = self.render(alert);
        std::io::stdout()
            .lock()
            .write_all(block.as_bytes())
            .map_err(|e| Error::SendFailed(format!("{}: {}", self.name, e)))
    }
}
