//! Alert types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema-less alert payload. Its shape depends on the alert's type and source.
pub type AlertData = Map<String, Value>;

/// Unique alert identifier, assigned by the registry and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl AlertId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AlertId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AlertId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alert type. Each type carries its own auto-actions and escalation delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertType {
    Security,
    System,
    Business,
    Inventory,
    Financial,
    Customer,
    Operational,
    Performance,
}

impl AlertType {
    /// All alert types, in display order.
    pub const ALL: [AlertType; 8] = [
        Self::Security,
        Self::System,
        Self::Business,
        Self::Inventory,
        Self::Financial,
        Self::Customer,
        Self::Operational,
        Self::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "SECURITY",
            Self::System => "SYSTEM",
            Self::Business => "BUSINESS",
            Self::Inventory => "INVENTORY",
            Self::Financial => "FINANCIAL",
            Self::Customer => "CUSTOMER",
            Self::Operational => "OPERATIONAL",
            Self::Performance => "PERFORMANCE",
        }
    }

    /// Parse an alert type. Matching is exact: `"system"` is not a valid type.
    pub fn from_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Comma-separated list of the valid type names, for error messages.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    pub const ALL: [AlertPriority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Priorities that get an automatic escalation timer on creation.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Priority after an escalation. Only `high` moves (to `critical`);
    /// every other priority is left as it is.
    pub fn escalated(self) -> Self {
        match self {
            Self::High => Self::Critical,
            other => other,
        }
    }
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one auto-action run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Executed,
    Failed,
}

/// Record of an auto-action executed when the alert was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoActionRecord {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub status: ActionStatus,
}

/// One entry of an alert's transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Input for creating an alert. Callers are expected to have validated it.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
    pub source: String,
    pub data: AlertData,
    pub user_id: Option<String>,
}

impl NewAlert {
    pub fn new(alert_type: AlertType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            alert_type,
            title: title.into(),
            message: message.into(),
            priority: AlertPriority::Medium,
            source: "system".to_string(),
            data: AlertData::new(),
            user_id: None,
        }
    }

    pub fn with_priority(mut self, priority: AlertPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_data(mut self, data: AlertData) -> Self {
        self.data = data;
        self
    }

    /// Insert a single payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }
}

/// An alert tracked through active → acknowledged → resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
    pub status: AlertStatus,
    pub source: String,
    #[serde(default)]
    pub data: AlertData,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub auto_actions: Vec<AutoActionRecord>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Alert {
    /// Build a fresh active alert with its `created` history entry.
    pub fn new(id: AlertId, new: NewAlert, now: DateTime<Utc>) -> Self {
        let actor = new.user_id.clone().unwrap_or_else(|| new.source.clone());
        Self {
            id,
            alert_type: new.alert_type,
            title: new.title,
            message: new.message,
            priority: new.priority,
            status: AlertStatus::Active,
            source: new.source,
            data: new.data,
            user_id: new.user_id,
            created_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            resolution: None,
            escalated_at: None,
            escalation_reason: None,
            auto_actions: Vec::new(),
            history: vec![HistoryEntry {
                action: "created".to_string(),
                timestamp: now,
                actor,
                details: None,
            }],
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    /// Append an entry to the transition log.
    pub fn record(&mut self, action: &str, actor: &str, details: Option<String>) {
        self.history.push(HistoryEntry {
            action: action.to_string(),
            timestamp: Utc::now(),
            actor: actor.to_string(),
            details: details.filter(|d| !d.is_empty()),
        });
    }

    pub fn acknowledge(&mut self, user_id: &str, comment: &str) {
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_at = Some(Utc::now());
        self.acknowledged_by = Some(user_id.to_string());
        self.record("acknowledged", user_id, Some(comment.to_string()));
    }

    pub fn resolve(&mut self, user_id: &str, resolution: &str) {
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(Utc::now());
        self.resolved_by = Some(user_id.to_string());
        if !resolution.is_empty() {
            self.resolution = Some(resolution.to_string());
        }
        self.record("resolved", user_id, Some(resolution.to_string()));
    }

    pub fn escalate(&mut self, reason: &str) {
        let previous = self.priority;
        self.priority = previous.escalated();
        self.escalated_at = Some(Utc::now());
        self.escalation_reason = Some(reason.to_string());
        self.record(
            "escalated",
            "system",
            Some(format!("{} ({} -> {})", reason, previous, self.priority)),
        );
    }

    /// Minutes between creation and resolution, if resolved.
    pub fn resolution_minutes(&self) -> Option<f64> {
        self.resolved_at
            .map(|resolved| (resolved - self.created_at).num_milliseconds() as f64 / 60_000.0)
    }
}
