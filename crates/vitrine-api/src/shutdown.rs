//! Graceful shutdown handling for the web server.

use crate::server::ServerState;

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Clean up resources before shutdown.
pub fn cleanup_resources(state: &ServerState) {
    let pending = state.registry.pending_escalations();
    state.registry.shutdown();

    let metrics = state.registry.metrics();
    tracing::info!(
        active_alerts = metrics.active,
        cancelled_escalations = pending,
        ws_connections = state.hub.connection_count(),
        "Shutdown complete"
    );

    let uptime = chrono::Utc::now().timestamp() - state.started_at;
    tracing::info!("Server uptime: {} seconds", uptime);
}
