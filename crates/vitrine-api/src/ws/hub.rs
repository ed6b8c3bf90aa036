//! Connection bookkeeping and fan-out.
//!
//! The hub owns every accepted connection together with the user and role
//! indexes used to route notifications. It never mutates alerts: it reads
//! the registry through its accessors and relays the registry's events.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use vitrine_alerts::{AlertEvent, AlertEventKind, AlertRegistry};

use super::connection::{ChannelKind, Connection, ConnectionInfo, WILDCARD};
use super::protocol::{self, InboundFrame, Outbound, ProtocolError};
use crate::auth::{AuthError, TokenValidator};
use crate::config::WsMode;

/// Role whose members receive every urgent notification.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Default)]
struct HubState {
    connections: HashMap<String, Connection>,
    by_user: HashMap<String, HashSet<String>>,
    by_role: HashMap<String, HashSet<String>>,
}

impl HubState {
    fn index(&mut self, id: &str, user_id: &str, roles: &[String]) {
        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(id.to_string());
        for role in roles {
            self.by_role
                .entry(role.clone())
                .or_default()
                .insert(id.to_string());
        }
    }

    fn unindex(&mut self, id: &str, user_id: Option<&str>, roles: &[String]) {
        if let Some(user_id) = user_id {
            remove_from(&mut self.by_user, user_id, id);
        }
        for role in roles {
            remove_from(&mut self.by_role, role, id);
        }
    }

    fn remove(&mut self, id: &str) -> Option<Connection> {
        let conn = self.connections.remove(id)?;
        self.unindex(id, conn.user_id.as_deref(), &conn.roles);
        Some(conn)
    }

    fn send(&mut self, id: &str, frame: &Value) -> bool {
        match self.connections.get_mut(id) {
            Some(conn) => conn.send_json(frame),
            None => false,
        }
    }
}

fn remove_from(index: &mut HashMap<String, HashSet<String>>, key: &str, id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

struct HubInner {
    registry: AlertRegistry,
    validator: TokenValidator,
    mode: WsMode,
    state: RwLock<HubState>,
}

/// WebSocket connection hub.
#[derive(Clone)]
pub struct ConnectionHub {
    inner: Arc<HubInner>,
}

impl ConnectionHub {
    pub fn new(registry: AlertRegistry, validator: TokenValidator, mode: WsMode) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry,
                validator,
                mode,
                state: RwLock::new(HubState::default()),
            }),
        }
    }

    pub fn mode(&self) -> WsMode {
        self.inner.mode
    }

    /// Track a new connection whose writer drains `tx`. Returns the client id.
    ///
    /// The client gets `connection_established`, and on the alerts channel
    /// the current active alerts.
    ///
    /// The snapshot is read under the hub lock, so any alert created after
    /// it is relayed to the new connection.
    pub fn register(&self, channel: ChannelKind, tx: mpsc::UnboundedSender<Outbound>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut conn = Connection::new(id.clone(), channel, tx);

        let mut state = self.inner.state.write();
        let mut delivered = conn.send_json(&protocol::connection_established(&id, channel.as_str()));
        if channel == ChannelKind::Alerts {
            let active = self.inner.registry.active_alerts();
            delivered &= conn.send_json(&protocol::active_alerts(&active));
        }
        if delivered {
            state.connections.insert(id.clone(), conn);
        }
        drop(state);

        if delivered {
            tracing::info!(category = "ws", client_id = %id, channel = %channel, "WebSocket client connected");
        } else {
            tracing::debug!(category = "ws", client_id = %id, "Client gone before registration");
        }
        id
    }

    /// Remove a connection from every index. Safe to call more than once.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.inner.state.write().remove(id);
        match removed {
            Some(conn) => {
                tracing::info!(
                    category = "ws",
                    client_id = %id,
                    channel = %conn.channel,
                    sent = conn.messages_sent,
                    received = conn.messages_received,
                    "WebSocket client disconnected"
                );
                true
            }
            None => false,
        }
    }

    /// Record a pong (or any sign of life) from the client.
    pub fn mark_alive(&self, id: &str) {
        if let Some(conn) = self.inner.state.write().connections.get_mut(id) {
            conn.is_alive = true;
            conn.last_heartbeat = Instant::now();
        }
    }

    /// Handle one inbound text frame. Failures become `error` frames; the
    /// connection stays open.
    pub fn handle_text(&self, id: &str, text: &str) {
        let channel = {
            let mut state = self.inner.state.write();
            let Some(conn) = state.connections.get_mut(id) else {
                return;
            };
            conn.messages_received += 1;
            conn.channel
        };

        let frame = match protocol::parse_frame(text) {
            Ok(frame) if channel.supports(frame.type_name()) => frame,
            Ok(frame) => {
                let e = ProtocolError::UnsupportedType(frame.type_name().to_string());
                self.reply(id, &protocol::error(&e.to_string()));
                return;
            }
            Err(e) => {
                tracing::debug!(category = "ws", client_id = %id, error = %e, "Rejected frame");
                self.reply(id, &protocol::error(&e.to_string()));
                return;
            }
        };

        match frame {
            InboundFrame::Authenticate { token } => self.authenticate(id, token.as_deref()),
            InboundFrame::Subscribe { subscriptions } => self.update_subscriptions(id, |subs| {
                subs.extend(subscriptions);
            }),
            InboundFrame::Unsubscribe { subscriptions } => self.update_subscriptions(id, |subs| {
                for tag in &subscriptions {
                    subs.remove(tag);
                }
            }),
            InboundFrame::GetActiveAlerts => {
                let active = self.inner.registry.active_alerts();
                self.reply(id, &protocol::active_alerts(&active));
            }
            InboundFrame::GetMetrics => {
                let metrics = self.inner.registry.metrics();
                self.reply(id, &protocol::metrics(&metrics));
            }
            InboundFrame::Ping => self.reply(id, &protocol::pong()),
        }
    }

    fn authenticate(&self, id: &str, token: Option<&str>) {
        let mode = self.inner.mode;
        let claims = match token.filter(|t| !t.is_empty()) {
            None => Err(AuthError::InvalidInput("Token manquant".to_string())),
            Some(token) => self.inner.validator.validate(token),
        };

        let claims = match claims {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(category = "ws", client_id = %id, code = e.code(), "WebSocket authentication failed");
                let message = match e {
                    AuthError::InvalidInput(msg) => msg,
                    AuthError::ExpiredToken => "Token expiré".to_string(),
                    _ => "Token invalide".to_string(),
                };
                self.reply(id, &protocol::auth_error(mode, &message));
                return;
            }
        };

        let roles = claims.all_roles();
        let mut state = self.inner.state.write();
        let Some(conn) = state.connections.get_mut(id) else {
            return;
        };
        let previous_user = conn.user_id.replace(claims.user_id.clone());
        let previous_roles = std::mem::replace(&mut conn.roles, roles.clone());

        state.unindex(id, previous_user.as_deref(), &previous_roles);
        state.index(id, &claims.user_id, &roles);
        let ok = state.send(id, &protocol::authenticated(mode, &claims.user_id, &roles));
        if !ok {
            state.remove(id);
        }
        drop(state);

        tracing::info!(category = "ws", client_id = %id, user_id = %claims.user_id, "WebSocket client authenticated");
    }

    fn update_subscriptions(&self, id: &str, update: impl FnOnce(&mut std::collections::BTreeSet<String>)) {
        let mut state = self.inner.state.write();
        let Some(conn) = state.connections.get_mut(id) else {
            return;
        };
        update(&mut conn.subscriptions);
        let current: Vec<String> = conn.subscriptions.iter().cloned().collect();
        if !conn.send_json(&protocol::subscription_updated(&current)) {
            state.remove(id);
        }
    }

    fn reply(&self, id: &str, frame: &Value) {
        let mut state = self.inner.state.write();
        if !state.send(id, frame) {
            state.remove(id);
        }
    }

    /// Fan one registry event out. Returns the number of frames delivered.
    ///
    /// Alerts connections get the event when their tags intersect
    /// `{"all", type}`. In unified mode urgent created/escalated alerts also
    /// produce a `notification` for the alert's user and for admins.
    pub fn relay_event(&self, event: &AlertEvent) -> usize {
        let alert = &event.alert;
        let frame = protocol::alert_event(event.kind, alert);
        let alert_type = alert.alert_type.as_str();

        let mut state = self.inner.state.write();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for conn in state.connections.values_mut() {
            if conn.channel != ChannelKind::Alerts || !conn.wants(alert_type) {
                continue;
            }
            if conn.send_json(&frame) {
                delivered += 1;
            } else {
                failed.push(conn.id.clone());
            }
        }

        let notify = self.inner.mode == WsMode::Unified
            && alert.priority.is_urgent()
            && matches!(event.kind, AlertEventKind::AlertCreated | AlertEventKind::AlertEscalated);
        if notify {
            let mut targets: HashSet<String> = HashSet::new();
            if let Some(ids) = alert.user_id.as_ref().and_then(|u| state.by_user.get(u)) {
                targets.extend(ids.iter().cloned());
            }
            if let Some(ids) = state.by_role.get(ADMIN_ROLE) {
                targets.extend(ids.iter().cloned());
            }

            let notification = protocol::notification(alert);
            for id in targets {
                let Some(conn) = state.connections.get_mut(&id) else {
                    continue;
                };
                if conn.channel != ChannelKind::Notifications {
                    continue;
                }
                if conn.send_json(&notification) {
                    delivered += 1;
                } else {
                    failed.push(id);
                }
            }
        }

        for id in &failed {
            state.remove(id);
        }
        drop(state);

        if !failed.is_empty() {
            tracing::warn!(category = "ws", dropped = failed.len(), "Dropped connections after failed send");
        }
        tracing::debug!(
            category = "ws",
            event = event.kind.as_str(),
            alert_id = %alert.id,
            delivered,
            "Relayed alert event"
        );
        delivered
    }

    /// Push `data` to realtime connections subscribed to `topic` or `all`.
    pub fn publish_realtime(&self, topic: &str, data: &Value) -> usize {
        let frame = protocol::realtime(topic, data);
        let mut state = self.inner.state.write();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for conn in state.connections.values_mut() {
            if conn.channel != ChannelKind::Realtime {
                continue;
            }
            if !(conn.subscriptions.contains(topic) || conn.subscriptions.contains(WILDCARD)) {
                continue;
            }
            if conn.send_json(&frame) {
                delivered += 1;
            } else {
                failed.push(conn.id.clone());
            }
        }
        for id in &failed {
            state.remove(id);
        }
        delivered
    }

    /// One heartbeat cycle. Connections that never answered the previous
    /// ping are closed and removed; the rest are pinged. Returns the ids
    /// that were terminated.
    pub fn heartbeat_tick(&self) -> Vec<String> {
        let mut state = self.inner.state.write();
        let mut terminated = Vec::new();

        for conn in state.connections.values_mut() {
            if !conn.is_alive {
                conn.send(Outbound::Close);
                terminated.push(conn.id.clone());
                continue;
            }
            conn.is_alive = false;
            if !conn.send(Outbound::Ping) {
                terminated.push(conn.id.clone());
            }
        }
        for id in &terminated {
            state.remove(id);
        }
        drop(state);

        for id in &terminated {
            tracing::info!(category = "ws", client_id = %id, "Terminated unresponsive WebSocket client");
        }
        terminated
    }

    /// Relay registry events until the registry's bus closes.
    pub async fn run_relay(self) -> anyhow::Result<()> {
        let mut events = self.inner.registry.subscribe();
        tracing::info!(category = "ws", "Alert event relay started");
        while let Some(event) = events.recv().await {
            self.relay_event(&event);
        }
        tracing::info!(category = "ws", "Alert event relay stopped");
        Ok(())
    }

    /// Run heartbeat cycles every `interval`, forever.
    pub async fn run_heartbeat(self, interval: Duration) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.heartbeat_tick();
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.state.read().connections.len()
    }

    pub fn channel_count(&self, channel: ChannelKind) -> usize {
        self.inner
            .state
            .read()
            .connections
            .values()
            .filter(|c| c.channel == channel)
            .count()
    }

    pub fn connection(&self, id: &str) -> Option<ConnectionInfo> {
        self.inner.state.read().connections.get(id).map(Connection::snapshot)
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.inner
            .state
            .read()
            .connections
            .values()
            .map(Connection::snapshot)
            .collect()
    }

    /// Connection ids indexed under `user_id`.
    pub fn user_connections(&self, user_id: &str) -> Vec<String> {
        self.inner
            .state
            .read()
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Connection ids indexed under `role`.
    pub fn role_connections(&self, role: &str) -> Vec<String> {
        self.inner
            .state
            .read()
            .by_role
            .get(role)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}
