//! Alert registry.
//!
//! The registry owns every alert the process has seen. It runs per-type
//! auto-actions on creation, schedules one escalation per urgent alert and
//! publishes lifecycle events on its [`AlertEventBus`].
//!
//! Auto-actions run before the state lock is taken. Every state change then
//! happens under the write lock and publishes its event before releasing
//! it, so history order and event order both follow call order.

use chrono::Utc;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::actions::{ActionExecutor, LoggingActionExecutor};
use super::alert::{Alert, AlertId, AlertStatus, AutoActionRecord, NewAlert};
use super::channels::{self, ChannelRegistry, NotificationChannel};
use super::error::{Error, Result};
use super::escalation::{EscalationPolicy, EscalationScheduler, DEFAULT_ESCALATION_REASON};
use super::events::{AlertEventBus, AlertEventKind, AlertEventReceiver};
use super::metrics::AlertMetrics;

/// Default number of alerts returned by [`AlertRegistry::alert_history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Default)]
struct RegistryState {
    /// Every alert ever created, resolved ones included.
    alerts: HashMap<AlertId, Alert>,
    /// Ids of unresolved alerts, in creation order.
    active: Vec<AlertId>,
    /// Ids of all alerts, in creation order.
    order: Vec<AlertId>,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    next_seq: AtomicU64,
    executor: Arc<dyn ActionExecutor>,
    events: AlertEventBus,
    scheduler: EscalationScheduler,
    policy: EscalationPolicy,
    channels: ChannelRegistry,
}

/// Builder for [`AlertRegistry`].
pub struct AlertRegistryBuilder {
    executor: Arc<dyn ActionExecutor>,
    policy: EscalationPolicy,
    event_capacity: usize,
}

impl AlertRegistryBuilder {
    pub fn executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn escalation_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn build(self) -> AlertRegistry {
        AlertRegistry {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState::default()),
                next_seq: AtomicU64::new(0),
                executor: self.executor,
                events: AlertEventBus::with_capacity(self.event_capacity),
                scheduler: EscalationScheduler::new(),
                policy: self.policy,
                channels: ChannelRegistry::new(),
            }),
        }
    }
}

/// Shared handle to the alert store. Cloning is cheap.
#[derive(Clone)]
pub struct AlertRegistry {
    inner: Arc<RegistryInner>,
}

impl AlertRegistry {
    /// Registry with the logging executor and descriptor escalation delays.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AlertRegistryBuilder {
        AlertRegistryBuilder {
            executor: Arc::new(LoggingActionExecutor),
            policy: EscalationPolicy::default(),
            event_capacity: super::events::DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Create an alert from already-validated input.
    ///
    /// Runs the type's auto-actions through the executor, schedules an
    /// escalation for `high`/`critical` alerts and dispatches them to the
    /// notification channels.
    pub fn create_alert(&self, new: NewAlert) -> Alert {
        let alert = self.prepare(new);
        let state = self.inner.state.write();
        self.store_locked(state, alert)
    }

    /// Like [`create_alert`](Self::create_alert), giving up when the state
    /// lock cannot be taken within `wait`.
    ///
    /// Used from the panic hook, where the panicking thread may already hold
    /// the lock.
    pub fn try_create_alert(&self, new: NewAlert, wait: Duration) -> Option<Alert> {
        let alert = self.prepare(new);
        let state = self.inner.state.try_write_for(wait)?;
        Some(self.store_locked(state, alert))
    }

    /// Build the alert and run its auto-actions. No lock is held, so the
    /// executor may read the registry.
    fn prepare(&self, new: NewAlert) -> Alert {
        let now = Utc::now();
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let id = AlertId(format!("alert_{}_{}", seq, now.timestamp_millis()));
        let mut alert = Alert::new(id, new, now);

        for action in alert.alert_type.descriptor().auto_actions {
            let status = self.inner.executor.execute(action, &alert);
            alert.auto_actions.push(AutoActionRecord {
                action: action.to_string(),
                timestamp: Utc::now(),
                status,
            });
        }
        alert
    }

    fn store_locked(&self, mut state: RwLockWriteGuard<'_, RegistryState>, alert: Alert) -> Alert {
        let id = alert.id.clone();
        let urgent = alert.priority.is_urgent();
        if urgent {
            self.schedule_escalation(&alert);
        }

        state.alerts.insert(id.clone(), alert.clone());
        state.active.push(id.clone());
        state.order.push(id);

        self.inner.events.publish(AlertEventKind::AlertCreated, &alert);
        drop(state);

        tracing::info!(
            category = "alerts",
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            priority = %alert.priority,
            source = %alert.source,
            "Alert created"
        );

        if urgent {
            self.notify_channels(&alert);
        }
        alert
    }

    /// Acknowledge an `active` alert.
    pub fn acknowledge_alert(&self, id: &AlertId, user_id: &str, comment: &str) -> Result<Alert> {
        let mut state = self.inner.state.write();
        if !state.active.contains(id) {
            return Err(not_active(id));
        }
        let alert = match state.alerts.get_mut(id) {
            Some(alert) if alert.status == AlertStatus::Active => alert,
            _ => return Err(not_active(id)),
        };

        alert.acknowledge(user_id, comment);
        let alert = alert.clone();
        self.inner.scheduler.cancel(id);
        self.inner.events.publish(AlertEventKind::AlertAcknowledged, &alert);

        tracing::info!(category = "alerts", alert_id = %id, user_id, "Alert acknowledged");
        Ok(alert)
    }

    /// Resolve an unresolved (active or acknowledged) alert.
    ///
    /// Resolved alerts leave the active index, so resolving twice fails with
    /// `NotFound` on the second call.
    pub fn resolve_alert(&self, id: &AlertId, user_id: &str, resolution: &str) -> Result<Alert> {
        let mut state = self.inner.state.write();
        let Some(position) = state.active.iter().position(|a| a == id) else {
            return Err(Error::NotFound(format!("Alert {} not found", id)));
        };
        let Some(alert) = state.alerts.get_mut(id) else {
            return Err(Error::Internal(format!("Alert {} indexed but missing", id)));
        };

        alert.resolve(user_id, resolution);
        let alert = alert.clone();
        state.active.remove(position);
        self.inner.scheduler.cancel(id);
        self.inner.events.publish(AlertEventKind::AlertResolved, &alert);

        tracing::info!(category = "alerts", alert_id = %id, user_id, "Alert resolved");
        Ok(alert)
    }

    /// Escalate an unresolved alert. `high` becomes `critical`; any other
    /// priority is kept but the escalation is still recorded.
    ///
    /// Returns `None` without touching anything for unknown or resolved ids.
    /// An empty `reason` records the default automatic reason.
    pub fn escalate_alert(&self, id: &AlertId, reason: &str) -> Option<Alert> {
        let mut state = self.inner.state.write();
        self.escalate_locked(&mut state, id, reason, false)
    }

    fn escalate_locked(
        &self,
        state: &mut RegistryState,
        id: &AlertId,
        reason: &str,
        only_active: bool,
    ) -> Option<Alert> {
        let alert = state
            .alerts
            .get_mut(id)
            .filter(|a| !a.is_resolved())
            .filter(|a| !only_active || a.status == AlertStatus::Active)?;

        let reason = if reason.is_empty() {
            DEFAULT_ESCALATION_REASON
        } else {
            reason
        };
        alert.escalate(reason);
        let alert = alert.clone();
        self.inner.events.publish(AlertEventKind::AlertEscalated, &alert);

        tracing::warn!(
            category = "alerts",
            alert_id = %id,
            priority = %alert.priority,
            reason,
            "Alert escalated"
        );
        Some(alert)
    }

    /// Unresolved alerts, in creation order.
    pub fn active_alerts(&self) -> Vec<Alert> {
        let state = self.inner.state.read();
        state
            .active
            .iter()
            .filter_map(|id| state.alerts.get(id).cloned())
            .collect()
    }

    /// All alerts, newest first, at most `limit` of them.
    pub fn alert_history(&self, limit: usize) -> Vec<Alert> {
        let state = self.inner.state.read();
        state
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| state.alerts.get(id).cloned())
            .collect()
    }

    /// Look an alert up by id, resolved ones included.
    pub fn get_alert(&self, id: &AlertId) -> Option<Alert> {
        self.inner.state.read().alerts.get(id).cloned()
    }

    pub fn metrics(&self) -> AlertMetrics {
        let state = self.inner.state.read();
        AlertMetrics::compute(state.alerts.values(), state.active.len())
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> AlertEventReceiver {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &AlertEventBus {
        &self.inner.events
    }

    /// Register a channel that receives `high`/`critical` alerts.
    pub fn add_notification_channel(&self, channel: Arc<dyn NotificationChannel>) {
        tracing::info!(
            category = "alerts",
            channel = channel.name(),
            channel_type = channel.channel_type(),
            "Notification channel registered"
        );
        self.inner.channels.register(channel);
    }

    pub fn notification_channels(&self) -> Vec<String> {
        self.inner.channels.list_names()
    }

    pub fn escalation_policy(&self) -> &EscalationPolicy {
        &self.inner.policy
    }

    /// Number of escalation timers still waiting to fire.
    pub fn pending_escalations(&self) -> usize {
        self.inner.scheduler.pending_count()
    }

    /// Cancel every pending escalation timer.
    pub fn shutdown(&self) {
        self.inner.scheduler.cancel_all();
    }

    fn schedule_escalation(&self, alert: &Alert) {
        let delay = self.inner.policy.delay(alert.alert_type);
        let weak: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        let id = alert.id.clone();

        self.inner.scheduler.schedule(alert.id.clone(), delay, move || {
            if let Some(inner) = weak.upgrade() {
                AlertRegistry { inner }.escalate_if_active(&id);
            }
        });
    }

    /// Timer callback: only alerts still `active` are escalated.
    fn escalate_if_active(&self, id: &AlertId) {
        let mut state = self.inner.state.write();
        if self
            .escalate_locked(&mut state, id, DEFAULT_ESCALATION_REASON, true)
            .is_none()
        {
            tracing::debug!(category = "alerts", alert_id = %id, "Escalation skipped, alert no longer active");
        }
    }

    fn notify_channels(&self, alert: &Alert) {
        let channels = self.inner.channels.enabled();
        if channels.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(channels::dispatch(channels, alert.clone()));
            }
            Err(_) => {
                tracing::warn!(
                    category = "alerts",
                    alert_id = %alert.id,
                    "No runtime available, notification dispatch skipped"
                );
            }
        }
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn not_active(id: &AlertId) -> Error {
    Error::NotFound(format!("Alert {} not found or not active", id))
}
