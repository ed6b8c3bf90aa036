//! Turns runtime failures into alerts.
//!
//! HTTP failures, panics, failed background tasks and deprecation notices
//! are recorded as synthetic alerts, so operators keep a trace of them even
//! when the process goes down right after.

use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::alert::{Alert, AlertData, AlertPriority, AlertType, NewAlert};
use super::registry::AlertRegistry;

/// Error names raised by token validation.
const AUTH_ERROR_NAMES: &[&str] = &[
    "JsonWebTokenError",
    "TokenExpiredError",
    "UNAUTHORIZED",
    "INVALID_TOKEN",
];

/// How long the panic hook waits for the registry lock.
const PANIC_LOCK_WAIT: Duration = Duration::from_millis(250);

tokio::task_local! {
    /// Set while a task started by `spawn_supervised` is being polled.
    static SUPERVISED: ();
}

/// Whether the current code runs inside a supervised task.
pub fn in_supervised_task() -> bool {
    SUPERVISED.try_with(|_| ()).is_ok()
}

/// Pick the alert type and priority for an HTTP failure.
///
/// `status` is `None` when the failure never got a status code.
pub fn classify_http_error(status: Option<u16>, error_name: &str) -> (AlertType, AlertPriority) {
    let alert_type = if matches!(status, Some(401) | Some(403)) || AUTH_ERROR_NAMES.contains(&error_name) {
        AlertType::Security
    } else {
        AlertType::System
    };

    let priority = if is_database_error(error_name) {
        AlertPriority::Critical
    } else if is_validation_error(error_name) {
        AlertPriority::Low
    } else if status.map_or(true, |s| s >= 500) {
        AlertPriority::High
    } else {
        AlertPriority::Medium
    };

    (alert_type, priority)
}

// Names are matched case-insensitively so exception-style names
// (`SequelizeDatabaseError`) and API codes (`DATABASE_ERROR`) both count.
fn is_database_error(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("database") || name.starts_with("sequelize") || name.contains("sql")
}

fn is_validation_error(name: &str) -> bool {
    name.to_ascii_lowercase().contains("validation")
}

/// Request details folded into an HTTP error alert.
#[derive(Debug, Clone, Default)]
pub struct HttpErrorContext {
    pub status: Option<u16>,
    pub error_name: String,
    pub message: String,
    pub method: String,
    pub path: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
}

/// Process exit behaviour after a panic has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanicPolicy {
    pub exit_on_panic: bool,
    pub grace: Duration,
}

/// What the panic hook does once the panic is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicOutcome {
    /// Keep the process running.
    Continue,
    /// Exit with status 1 after the delay.
    Exit(Duration),
}

impl Default for PanicPolicy {
    fn default() -> Self {
        Self {
            exit_on_panic: true,
            grace: Duration::from_millis(1000),
        }
    }
}

/// Creates alerts for failures outside the normal alert flow.
#[derive(Clone)]
pub struct ErrorAlertBridge {
    registry: AlertRegistry,
}

impl ErrorAlertBridge {
    pub fn new(registry: AlertRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AlertRegistry {
        &self.registry
    }

    /// Record an HTTP failure.
    pub fn report_http_error(&self, ctx: &HttpErrorContext) -> Alert {
        let (alert_type, priority) = classify_http_error(ctx.status, &ctx.error_name);
        let title = match ctx.status {
            Some(status) => format!("Erreur HTTP {} sur {} {}", status, ctx.method, ctx.path),
            None => format!("Erreur HTTP sur {} {}", ctx.method, ctx.path),
        };

        let new = NewAlert::new(alert_type, title, ctx.message.clone())
            .with_priority(priority)
            .with_source("error_handler")
            .with_user(ctx.user_id.clone())
            .with_data(object(json!({
                "statusCode": ctx.status,
                "errorName": ctx.error_name,
                "method": ctx.method,
                "path": ctx.path,
                "ip": ctx.ip,
                "userAgent": ctx.user_agent,
                "userId": ctx.user_id,
            })));

        self.registry.create_alert(new)
    }

    /// Record a panic. Returns `None` if the registry stayed locked.
    pub fn report_panic(&self, message: &str, location: Option<String>) -> Option<Alert> {
        let new = NewAlert::new(
            AlertType::System,
            "Erreur critique non gérée",
            format!("Le processus a rencontré une erreur fatale: {}", message),
        )
        .with_priority(AlertPriority::Critical)
        .with_source("process")
        .with_data(object(json!({
            "kind": "panic",
            "message": message,
            "location": location,
        })));

        self.registry.try_create_alert(new, PANIC_LOCK_WAIT)
    }

    /// Record a failed background task. The process keeps running.
    pub fn report_task_failure(&self, task: &str, error: &str) -> Alert {
        let new = NewAlert::new(
            AlertType::System,
            "Tâche en arrière-plan en échec",
            format!("La tâche {} a échoué: {}", task, error),
        )
        .with_priority(AlertPriority::High)
        .with_source("process")
        .with_data(object(json!({
            "kind": "task_failure",
            "task": task,
            "error": error,
        })));

        self.registry.create_alert(new)
    }

    pub fn report_deprecation(&self, feature: &str, message: &str) -> Alert {
        let new = NewAlert::new(
            AlertType::System,
            "Fonctionnalité obsolète utilisée",
            message.to_string(),
        )
        .with_priority(AlertPriority::Low)
        .with_source("process")
        .with_data(object(json!({
            "kind": "deprecation",
            "feature": feature,
        })));

        self.registry.create_alert(new)
    }

    /// Alert for a failed database operation.
    pub fn create_database_error_alert(&self, operation: &str, error: &str, extra: AlertData) -> Alert {
        let mut data = object(json!({
            "operation": operation,
            "error": error,
        }));
        data.extend(extra);

        let new = NewAlert::new(
            AlertType::System,
            "Erreur de base de données",
            format!("L'opération {} a échoué: {}", operation, error),
        )
        .with_priority(AlertPriority::High)
        .with_source("database")
        .with_data(data);

        self.registry.create_alert(new)
    }

    /// Alert for a failed call to a third-party service.
    pub fn create_external_api_error_alert(
        &self,
        service: &str,
        endpoint: &str,
        status: Option<u16>,
        error: &str,
    ) -> Alert {
        let new = NewAlert::new(
            AlertType::System,
            format!("Erreur API externe: {}", service),
            format!("L'appel à {} a échoué: {}", endpoint, error),
        )
        .with_priority(AlertPriority::Medium)
        .with_source("external_api")
        .with_data(object(json!({
            "service": service,
            "endpoint": endpoint,
            "statusCode": status,
            "error": error,
        })));

        self.registry.create_alert(new)
    }

    /// Alert for a metric over its threshold. Priority is `high` past twice
    /// the threshold, `medium` otherwise.
    pub fn create_performance_alert(&self, metric: &str, value: f64, threshold: f64) -> Alert {
        let priority = if value > threshold * 2.0 {
            AlertPriority::High
        } else {
            AlertPriority::Medium
        };

        let new = NewAlert::new(
            AlertType::Performance,
            format!("Seuil de performance dépassé: {}", metric),
            format!("{} = {} (seuil: {})", metric, value, threshold),
        )
        .with_priority(priority)
        .with_source("performance_monitor")
        .with_data(object(json!({
            "metric": metric,
            "value": value,
            "threshold": threshold,
        })));

        self.registry.create_alert(new)
    }

    /// Spawn a background task whose failure (error or panic) raises a
    /// `high` alert instead of disappearing silently.
    ///
    /// A panic inside the task never exits the process, whatever the panic
    /// policy: the hook leaves it to the supervisor.
    pub fn spawn_supervised<F>(&self, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let bridge = self.clone();
        tokio::spawn(async move {
            let outcome = tokio::spawn(SUPERVISED.scope((), task)).await;
            let error = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(e)) => format!("{:#}", e),
                Err(join) if join.is_panic() => "panicked".to_string(),
                Err(_) => return,
            };
            tracing::error!(category = "alerts", task = name, error = %error, "Background task failed");
            bridge.report_task_failure(name, &error);
        })
    }

    /// Decide what a panic leads to.
    ///
    /// Panics in supervised tasks are only logged; their supervisor raises
    /// the alert. Any other panic records a critical alert and, when the
    /// policy says so, exits after the grace delay.
    pub fn handle_panic(
        &self,
        policy: PanicPolicy,
        message: &str,
        location: Option<String>,
        supervised: bool,
    ) -> PanicOutcome {
        if supervised {
            tracing::error!(category = "alerts", message, location = ?location, "Panic in supervised task");
            return PanicOutcome::Continue;
        }

        if self.report_panic(message, location).is_none() {
            tracing::error!(category = "alerts", "Could not record panic alert, registry busy");
        }
        if policy.exit_on_panic {
            PanicOutcome::Exit(policy.grace)
        } else {
            PanicOutcome::Continue
        }
    }

    /// Install a panic hook that runs [`handle_panic`](Self::handle_panic).
    ///
    /// The previous hook still runs first.
    pub fn install_panic_hook(&self, policy: PanicPolicy) {
        let bridge = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);

            let message = panic_message(info.payload());
            let location = info.location().map(|l| format!("{}:{}", l.file(), l.line()));
            let outcome = bridge.handle_panic(policy, &message, location, in_supervised_task());

            if let PanicOutcome::Exit(grace) = outcome {
                std::thread::spawn(move || {
                    std::thread::sleep(grace);
                    std::process::exit(1);
                });
            }
        }));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn object(value: Value) -> AlertData {
    match value {
        Value::Object(map) => map,
        _ => AlertData::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_security() {
        assert_eq!(classify_http_error(Some(401), "Error").0, AlertType::Security);
        assert_eq!(classify_http_error(Some(403), "Error").0, AlertType::Security);
        assert_eq!(
            classify_http_error(Some(400), "TokenExpiredError").0,
            AlertType::Security
        );
        assert_eq!(classify_http_error(Some(500), "Error").0, AlertType::System);
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify_http_error(Some(400), "SequelizeDatabaseError").1,
            AlertPriority::Critical
        );
        assert_eq!(
            classify_http_error(Some(500), "ValidationError").1,
            AlertPriority::Low
        );
        assert_eq!(
            classify_http_error(Some(500), "DATABASE_ERROR").1,
            AlertPriority::Critical
        );
        assert_eq!(
            classify_http_error(Some(503), "POSTGRESQL_TIMEOUT").1,
            AlertPriority::Critical
        );
        assert_eq!(
            classify_http_error(Some(500), "VALIDATION_ERROR").1,
            AlertPriority::Low
        );
        assert_eq!(classify_http_error(Some(502), "Error").1, AlertPriority::High);
        assert_eq!(classify_http_error(None, "Error").1, AlertPriority::High);
        assert_eq!(classify_http_error(Some(401), "Error").1, AlertPriority::Medium);
    }

    #[test]
    fn test_report_http_error_folds_request() {
        let bridge = ErrorAlertBridge::new(AlertRegistry::new());
        let alert = bridge.report_http_error(&HttpErrorContext {
            status: Some(401),
            error_name: "UNAUTHORIZED".to_string(),
            message: "Token invalide".to_string(),
            method: "GET".to_string(),
            path: "/api/alerts".to_string(),
            ip: Some("10.0.0.7".to_string()),
            user_agent: Some("curl/8".to_string()),
            user_id: None,
        });

        assert_eq!(alert.alert_type, AlertType::Security);
        assert_eq!(alert.source, "error_handler");
        assert_eq!(alert.data["path"], "/api/alerts");
        assert_eq!(alert.data["ip"], "10.0.0.7");
        assert_eq!(alert.data["statusCode"], 401);
    }

    #[test]
    fn test_performance_priority_threshold() {
        let bridge = ErrorAlertBridge::new(AlertRegistry::new());
        let medium = bridge.create_performance_alert("response_time_ms", 1500.0, 1000.0);
        let high = bridge.create_performance_alert("response_time_ms", 2500.0, 1000.0);
        let boundary = bridge.create_performance_alert("response_time_ms", 2000.0, 1000.0);

        assert_eq!(medium.priority, AlertPriority::Medium);
        assert_eq!(high.priority, AlertPriority::High);
        assert_eq!(boundary.priority, AlertPriority::Medium);
        assert_eq!(high.alert_type, AlertType::Performance);
    }

    #[test]
    fn test_helper_shapes() {
        let bridge = ErrorAlertBridge::new(AlertRegistry::new());

        let mut extra = AlertData::new();
        extra.insert("table".to_string(), json!("orders"));
        let db = bridge.create_database_error_alert("insert", "connection refused", extra);
        assert_eq!(db.data["operation"], "insert");
        assert_eq!(db.data["table"], "orders");

        let api = bridge.create_external_api_error_alert("sage", "/sync/orders", Some(503), "timeout");
        assert_eq!(api.data["service"], "sage");
        assert_eq!(api.priority, AlertPriority::Medium);

        let deprecation = bridge.report_deprecation("JWT_SECRET", "use VITRINE_JWT_SECRET");
        assert_eq!(deprecation.priority, AlertPriority::Low);
        assert_eq!(deprecation.alert_type, AlertType::System);
    }

    #[tokio::test]
    async fn test_supervised_panic_raises_alert_without_exit() {
        let registry = AlertRegistry::new();
        let bridge = ErrorAlertBridge::new(registry.clone());

        let (tx, rx) = tokio::sync::oneshot::channel();
        bridge
            .spawn_supervised("marker", async move {
                let _ = tx.send(in_supervised_task());
                Ok(())
            })
            .await
            .unwrap();
        assert!(rx.await.unwrap());
        assert!(!in_supervised_task());

        bridge
            .spawn_supervised("worker", async { panic!("worker exploded") })
            .await
            .unwrap();
        let active = registry.active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].priority, AlertPriority::High);
        assert_eq!(active[0].data["task"], "worker");
        registry.shutdown();
    }

    #[test]
    fn test_handle_panic_outcomes() {
        let registry = AlertRegistry::new();
        let bridge = ErrorAlertBridge::new(registry.clone());
        let policy = PanicPolicy {
            exit_on_panic: true,
            grace: Duration::from_millis(50),
        };

        assert_eq!(
            bridge.handle_panic(policy, "boom", None, true),
            PanicOutcome::Continue
        );
        assert!(registry.active_alerts().is_empty());

        assert_eq!(
            bridge.handle_panic(policy, "boom", None, false),
            PanicOutcome::Exit(Duration::from_millis(50))
        );
        let lenient = PanicPolicy {
            exit_on_panic: false,
            ..policy
        };
        assert_eq!(
            bridge.handle_panic(lenient, "boom", None, false),
            PanicOutcome::Continue
        );

        let alerts = registry.active_alerts();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.priority == AlertPriority::Critical));
        registry.shutdown();
    }

    #[test]
    fn test_report_panic_is_critical() {
        let bridge = ErrorAlertBridge::new(AlertRegistry::new());
        let alert = bridge
            .report_panic("index out of bounds", Some("src/main.rs:10".to_string()))
            .unwrap();
        assert_eq!(alert.priority, AlertPriority::Critical);
        assert_eq!(alert.data["location"], "src/main.rs:10");
    }

    #[tokio::test]
    async fn test_supervised_failure_raises_alert() {
        let registry = AlertRegistry::new();
        let bridge = ErrorAlertBridge::new(registry.clone());

        bridge
            .spawn_supervised("sync", async { Err(anyhow::anyhow!("upstream down")) })
            .await
            .unwrap();
        bridge.spawn_supervised("ok", async { Ok(()) }).await.unwrap();

        let active = registry.active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].priority, AlertPriority::High);
        assert_eq!(active[0].data["task"], "sync");
        registry.shutdown();
    }
}
