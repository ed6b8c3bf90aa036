//! Server state and types.

use std::sync::Arc;

use vitrine_alerts::{AlertRegistry, ConsoleChannel, ErrorAlertBridge};

use crate::auth::TokenValidator;
use crate::config::ServerConfig;
use crate::gateway::AlertGateway;
use crate::ws::ConnectionHub;

/// Maximum request body size (1 MB)
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// Server state shared across all handlers.
///
/// Everything hangs off one explicitly built [`AlertRegistry`]; the gateway,
/// hub and bridge each hold a handle to it.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub registry: AlertRegistry,
    pub gateway: AlertGateway,
    pub hub: ConnectionHub,
    pub bridge: ErrorAlertBridge,
    pub validator: TokenValidator,
    /// Server start timestamp.
    pub started_at: i64,
}

impl ServerState {
    /// Build the state around a fresh registry configured from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let registry = AlertRegistry::builder()
            .escalation_policy(config.escalation.clone())
            .build();
        Self::with_registry(config, registry)
    }

    /// Build the state around an existing registry.
    ///
    /// Notification channels enabled in `config` are added to the registry.
    pub fn with_registry(config: ServerConfig, registry: AlertRegistry) -> Self {
        if config.notifications.console {
            let console = ConsoleChannel::new("console").with_details(config.notifications.console_details);
            registry.add_notification_channel(Arc::new(console));
        }

        let validator = TokenValidator::new(config.jwt_secret.clone());
        let hub = ConnectionHub::new(registry.clone(), validator.clone(), config.ws.mode);

        Self {
            gateway: AlertGateway::new(registry.clone()),
            bridge: ErrorAlertBridge::new(registry.clone()),
            hub,
            validator,
            registry,
            config: Arc::new(config),
            started_at: chrono::Utc::now().timestamp(),
        }
    }
}
