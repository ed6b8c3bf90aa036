//! Auto-actions run when an alert is created.

use super::alert::{ActionStatus, Alert};

/// Executes the named auto-actions configured for an alert type.
///
/// Runs synchronously inside `create_alert`, before the alert is stored and
/// without the registry lock held, so implementations may read the registry
/// (the new alert is not in it yet). They must not block for long; hand real
/// work off to a task.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, action: &str, alert: &Alert) -> ActionStatus;
}

/// Action names the logging executor knows about.
pub const KNOWN_ACTIONS: &[&str] = &[
    "notify_admins",
    "notify_managers",
    "notify_inventory_team",
    "notify_finance_team",
    "notify_customer_service",
    "notify_operations",
    "log_security_event",
    "block_suspicious_ip",
    "check_system_health",
    "check_stock_levels",
    "audit_transaction",
    "collect_performance_metrics",
];

/// Default executor: every known action is a logged no-op.
#[derive(Debug, Clone, Default)]
pub struct LoggingActionExecutor;

impl ActionExecutor for LoggingActionExecutor {
    fn execute(&self, action: &str, alert: &Alert) -> ActionStatus {
        if !KNOWN_ACTIONS.contains(&action) {
            tracing::warn!(
                category = "alerts",
                alert_id = %alert.id,
                action,
                "Unknown auto-action"
            );
            return ActionStatus::Failed;
        }

        match action {
            "block_suspicious_ip" => {
                let ip = alert.data.get("ip").and_then(|v| v.as_str()).unwrap_or("unknown");
                tracing::warn!(category = "alerts", alert_id = %alert.id, ip, "Suspicious IP flagged");
            }
            "log_security_event" => {
                tracing::warn!(
                    category = "security",
                    alert_id = %alert.id,
                    title = %alert.title,
                    source = %alert.source,
                    "Security event"
                );
            }
            _ => {
                tracing::info!(
                    category = "alerts",
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    action,
                    "Auto-action executed"
                );
            }
        }
        ActionStatus::Executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertId, AlertType, NewAlert};

    #[test]
    fn test_known_and_unknown_actions() {
        let alert = Alert::new(
            AlertId::from("alert_1"),
            NewAlert::new(AlertType::Security, "t", "m"),
            chrono::Utc::now(),
        );
        let executor = LoggingActionExecutor;
        assert_eq!(executor.execute("notify_admins", &alert), ActionStatus::Executed);
        assert_eq!(executor.execute("block_suspicious_ip", &alert), ActionStatus::Executed);
        assert_eq!(executor.execute("reboot_datacenter", &alert), ActionStatus::Failed);
    }

    #[test]
    fn test_every_descriptor_action_is_known() {
        for t in AlertType::ALL {
            for action in t.descriptor().auto_actions {
                assert!(KNOWN_ACTIONS.contains(action), "{} not known", action);
            }
        }
    }
}
