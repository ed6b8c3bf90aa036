//! Common test utilities for API tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use vitrine_api::config::{Environment, ServerConfig, WsMode};
use vitrine_api::ws::{ChannelKind, ConnectionHub, Outbound};
use vitrine_api::{create_router_with_state, ServerState};

pub const TEST_SECRET: &str = "test-secret";

/// Create a server state for testing with its own registry.
pub fn create_test_server_state(mode: WsMode) -> ServerState {
    create_test_server_state_in(mode, Environment::Development)
}

pub fn create_test_server_state_in(mode: WsMode, environment: Environment) -> ServerState {
    let mut config = ServerConfig::default();
    config.jwt_secret = Some(TEST_SECRET.to_string());
    config.ws.mode = mode;
    config.environment = environment;
    ServerState::new(config)
}

pub fn test_router(state: &ServerState) -> Router {
    create_router_with_state(state.clone())
}

/// Send one request through `router` and decode the JSON response.
pub async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// A hub connection backed by an in-memory queue instead of a socket.
pub struct TestClient {
    pub id: String,
    pub rx: mpsc::UnboundedReceiver<Outbound>,
}

impl TestClient {
    pub fn connect(hub: &ConnectionHub, channel: ChannelKind) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(channel, tx);
        Self { id, rx }
    }

    /// Every queued text frame, decoded.
    pub fn frames(&mut self) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                Outbound::Text(text) => Some(serde_json::from_str(&text).unwrap()),
                _ => None,
            })
            .collect()
    }

    /// Every queued message, text or control.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn frame_types(&mut self) -> Vec<String> {
        self.frames()
            .iter()
            .filter_map(|f| f["type"].as_str().map(str::to_string))
            .collect()
    }
}
