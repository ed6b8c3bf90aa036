//! Alert system for Vitrine.
//!
//! Alerts record notable events that need operator attention: security
//! incidents, system faults, business thresholds. Each alert goes through
//! `active → acknowledged → resolved`.
//!
//! ## Features
//!
//! - **Registry**: create, acknowledge, resolve and escalate alerts
//! - **Types**: eight alert types, each with its auto-actions and escalation delay
//! - **Escalation**: one cancellable timer per `high`/`critical` alert
//! - **Events**: lifecycle events on a broadcast channel
//! - **Notification Channels**: Console, Memory
//! - **Error bridge**: HTTP failures, panics and failed tasks become alerts
//!
//! ## Example
//!
//! ```rust,no_run
//! use vitrine_alerts::{AlertPriority, AlertRegistry, AlertType, NewAlert};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = AlertRegistry::new();
//!     let mut events = registry.subscribe();
//!
//!     let alert = registry.create_alert(
//!         NewAlert::new(AlertType::Inventory, "Stock faible", "SKU-42 sous le seuil")
//!             .with_priority(AlertPriority::High),
//!     );
//!
//!     let event = events.recv().await.unwrap();
//!     assert_eq!(event.alert.id, alert.id);
//! }
//! ```

pub mod actions;
pub mod alert;
pub mod bridge;
pub mod category;
pub mod channels;
pub mod error;
pub mod escalation;
pub mod events;
pub mod metrics;
pub mod registry;

pub use actions::{ActionExecutor, LoggingActionExecutor};
pub use alert::{
    ActionStatus, Alert, AlertData, AlertId, AlertPriority, AlertStatus, AlertType,
    AutoActionRecord, HistoryEntry, NewAlert,
};
pub use bridge::{
    classify_http_error, in_supervised_task, ErrorAlertBridge, HttpErrorContext, PanicOutcome,
    PanicPolicy,
};
pub use category::{descriptor_table, AlertTypeDescriptor};
pub use channels::{ChannelRegistry, ConsoleChannel, MemoryChannel, NotificationChannel};
pub use error::{Error, Result};
pub use escalation::{EscalationPolicy, EscalationScheduler, DEFAULT_ESCALATION_REASON};
pub use events::{AlertEvent, AlertEventBus, AlertEventKind, AlertEventReceiver};
pub use metrics::AlertMetrics;
pub use registry::{AlertRegistry, AlertRegistryBuilder, DEFAULT_HISTORY_LIMIT};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
