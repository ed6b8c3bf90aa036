//! Alert escalation scheduling.
//!
//! Urgent alerts get one delayed escalation task each. The task is cancelled
//! when the alert is acknowledged or resolved; the registry also re-checks
//! the alert's status when the task fires.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::alert::{AlertId, AlertType};

/// Default reason recorded on automatic escalations.
pub const DEFAULT_ESCALATION_REASON: &str = "Escalade automatique";

/// Per-type escalation delays, in milliseconds.
///
/// Types without an override use the delay from their descriptor. Loaded
/// from the `[escalation]` table of the server configuration, e.g.
/// `SYSTEM = 120000`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct EscalationPolicy {
    overrides: BTreeMap<AlertType, u64>,
}

impl TryFrom<BTreeMap<String, u64>> for EscalationPolicy {
    type Error = String;

    fn try_from(raw: BTreeMap<String, u64>) -> Result<Self, Self::Error> {
        let mut overrides = BTreeMap::new();
        for (name, delay_ms) in raw {
            let alert_type = AlertType::from_string(&name).ok_or_else(|| {
                format!("Unknown alert type {}, expected one of {}", name, AlertType::valid_names())
            })?;
            overrides.insert(alert_type, delay_ms);
        }
        Ok(Self { overrides })
    }
}

impl From<EscalationPolicy> for BTreeMap<String, u64> {
    fn from(policy: EscalationPolicy) -> Self {
        policy
            .overrides
            .into_iter()
            .map(|(t, delay)| (t.as_str().to_string(), delay))
            .collect()
    }
}

impl EscalationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, alert_type: AlertType, delay_ms: u64) -> Self {
        self.overrides.insert(alert_type, delay_ms);
        self
    }

    pub fn delay_ms(&self, alert_type: AlertType) -> u64 {
        self.overrides
            .get(&alert_type)
            .copied()
            .unwrap_or_else(|| alert_type.descriptor().escalation_delay_ms)
    }

    pub fn delay(&self, alert_type: AlertType) -> Duration {
        Duration::from_millis(self.delay_ms(alert_type))
    }

    pub fn overrides(&self) -> &BTreeMap<AlertType, u64> {
        &self.overrides
    }
}

/// Runs one cancellable delayed task per alert.
#[derive(Clone, Default)]
pub struct EscalationScheduler {
    pending: Arc<Mutex<HashMap<AlertId, JoinHandle<()>>>>,
}

impl EscalationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` after `delay` unless cancelled first.
    ///
    /// Returns `false` when there is no tokio runtime to host the timer; the
    /// alert then simply never escalates on its own.
    pub fn schedule<F>(&self, id: AlertId, delay: Duration, fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    category = "alerts",
                    alert_id = %id,
                    "No runtime available, escalation timer not scheduled"
                );
                return false;
            }
        };

        // Holding the lock across spawn keeps the task from removing its own
        // entry before it is inserted.
        let mut pending = self.pending.lock();
        let registry = Arc::clone(&self.pending);
        let task_id = id.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            registry.lock().remove(&task_id);
            fire();
        });

        if let Some(previous) = pending.insert(id, handle) {
            previous.abort();
        }
        true
    }

    /// Cancel the pending task for `id`. Returns whether one was pending.
    pub fn cancel(&self, id: &AlertId) -> bool {
        match self.pending.lock().remove(id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: &AlertId) -> bool {
        self.pending.lock().contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Abort every pending task.
    pub fn cancel_all(&self) {
        for (_, handle) in self.pending.lock().drain() {
            handle.abort();
        }
    }
}
