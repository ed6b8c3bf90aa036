//! API handlers organized by domain.

pub mod alerts;
pub mod basic;
pub mod common;
pub mod ws;

// Re-export ServerState so handlers can use it
pub use crate::server::ServerState;

pub use alerts::{
    acknowledge_alert_handler, active_alerts_handler, alert_history_handler,
    alert_metrics_handler, alert_types_handler, create_alert_handler, create_test_alert_handler,
    escalate_alert_handler, get_alert_handler, resolve_alert_handler,
};
pub use basic::health_handler;
pub use ws::{alerts_ws_handler, unified_ws_handler};
