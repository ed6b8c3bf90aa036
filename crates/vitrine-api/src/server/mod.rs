//! Web server for Vitrine.
//!
//! REST API for alert management and WebSocket fan-out of alert events.

pub mod middleware;
pub mod router;
pub mod types;

pub use middleware::error_alert_middleware;
pub use router::create_router_with_state;
pub use types::{ServerState, MAX_REQUEST_BODY_SIZE};

use std::net::SocketAddr;

use crate::config::{ConfigNotice, LoadedConfig};
use crate::startup::{ServiceStatus, StartupLogger};

/// Start the web server and run until a shutdown signal arrives.
pub async fn run(loaded: LoadedConfig, mut startup: StartupLogger) -> anyhow::Result<()> {
    let LoadedConfig {
        config,
        source,
        notices,
    } = loaded;
    let bind = config.bind_addr()?;

    startup.banner();
    startup.phase_init();

    match &source {
        Some(path) => startup.detail(&format!("config: {}", path.display())),
        None => startup.detail("config: defaults"),
    }

    let state = ServerState::new(config);
    startup.service("Alert registry", ServiceStatus::Started);
    let console_status = if state.config.notifications.console {
        ServiceStatus::Started
    } else {
        ServiceStatus::Disabled
    };
    startup.service("Console notifications", console_status);

    state.bridge.install_panic_hook(state.config.panic.policy());
    let panic_status = if state.config.panic.exit_on_panic {
        ServiceStatus::Started
    } else {
        ServiceStatus::Warning
    };
    startup.service("Panic alerts", panic_status);

    for notice in &notices {
        let ConfigNotice::Deprecated { feature, message } = notice;
        startup.warning(message);
        state.bridge.report_deprecation(feature, message);
    }

    if !state.validator.is_configured() {
        startup.service("WebSocket authentication", ServiceStatus::Disabled);
        tracing::warn!(category = "config", "No JWT secret configured, WebSocket authentication will fail");
    } else {
        startup.service("WebSocket authentication", ServiceStatus::Started);
    }

    startup.phase_services();

    state
        .bridge
        .spawn_supervised("alert_relay", state.hub.clone().run_relay());
    startup.service("Alert event relay", ServiceStatus::Started);

    let interval = state.config.ws.heartbeat_interval();
    state
        .bridge
        .spawn_supervised("ws_heartbeat", state.hub.clone().run_heartbeat(interval));
    startup.service("WebSocket heartbeat", ServiceStatus::Started);

    let state_for_cleanup = state.clone();
    let app = create_router_with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;

    startup.phase_ready();
    startup.ready_info(&state_for_cleanup.config);
    tracing::info!(category = "http", addr = %bind, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(crate::shutdown::shutdown_signal())
    .await?;

    crate::shutdown::cleanup_resources(&state_for_cleanup);

    tracing::info!("Server shutdown complete");
    Ok(())
}
