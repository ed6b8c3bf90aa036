//! API server for Vitrine.
//!
//! This crate provides the HTTP/WebSocket front of the alert system:
//! validated REST endpoints over the alert registry, WebSocket fan-out of
//! alert events, and the middleware turning failed requests into alerts.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod server;
pub mod shutdown;
pub mod startup;
pub mod ws;

pub use auth::{AuthError, TokenClaims, TokenValidator};
pub use config::{ConfigError, ConfigNotice, Environment, LoadedConfig, ServerConfig, WsMode};
pub use gateway::AlertGateway;
pub use models::{ApiResponse, ApiResult, ErrorResponse};
pub use server::{create_router_with_state, run, ServerState};
pub use startup::StartupLogger;
pub use ws::{ChannelKind, ConnectionHub};
