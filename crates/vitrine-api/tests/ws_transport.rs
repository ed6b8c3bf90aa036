//! WebSocket tests over real sockets, through the router and the upgrade handlers.

mod common;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use vitrine_alerts::{AlertType, NewAlert};
use vitrine_api::config::WsMode;
use vitrine_api::ws::ChannelKind;
use vitrine_api::ServerState;

use common::{create_test_server_state, test_router};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(state: &ServerState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = test_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
    ws
}

/// Next text frame, decoded. Control frames are skipped.
async fn next_frame(ws: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within 5s")
            .expect("stream ended")
            .unwrap();
        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message {:?}", other),
        }
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn test_alerts_socket_lifecycle() {
    let state = create_test_server_state(WsMode::Dedicated);
    state
        .registry
        .create_alert(NewAlert::new(AlertType::Inventory, "Stock faible", "SKU-42"));
    let addr = spawn_server(&state).await;

    let mut ws = connect(addr, "/ws/alerts").await;
    let greeting = next_frame(&mut ws).await;
    assert_eq!(greeting["type"], "connection_established");
    assert_eq!(greeting["channel"], "alerts");
    let snapshot = next_frame(&mut ws).await;
    assert_eq!(snapshot["type"], "active_alerts");
    assert_eq!(snapshot["count"], 1);
    wait_until(|| state.hub.connection_count() == 1).await;

    ws.send(Message::Text("{not json".to_string())).await.unwrap();
    let frame = next_frame(&mut ws).await;
    assert_eq!(frame["type"], "error");

    ws.send(Message::Binary(br#"{"type":"ping"}"#.to_vec())).await.unwrap();
    assert_eq!(next_frame(&mut ws).await["type"], "pong");

    let client_id = greeting["clientId"].as_str().unwrap().to_string();
    assert_eq!(state.hub.connection(&client_id).unwrap().messages_received, 2);

    ws.close(None).await.unwrap();
    wait_until(|| state.hub.connection_count() == 0).await;
    assert!(state.hub.connection(&client_id).is_none());
}

#[tokio::test]
async fn test_heartbeat_over_socket() {
    let state = create_test_server_state(WsMode::Dedicated);
    let addr = spawn_server(&state).await;

    let mut responsive = connect(addr, "/ws/alerts").await;
    let responsive_id = next_frame(&mut responsive).await["clientId"]
        .as_str()
        .unwrap()
        .to_string();
    next_frame(&mut responsive).await;
    let mut silent = connect(addr, "/ws/alerts").await;
    let silent_id = next_frame(&mut silent).await["clientId"]
        .as_str()
        .unwrap()
        .to_string();
    next_frame(&mut silent).await;
    wait_until(|| state.hub.connection_count() == 2).await;

    assert!(state.hub.heartbeat_tick().is_empty());
    assert!(!state.hub.connection(&responsive_id).unwrap().is_alive);

    // Reading the ping queues the automatic pong, the next write flushes it.
    let ping = tokio::time::timeout(Duration::from_secs(5), responsive.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(ping, Message::Ping(_)));
    responsive
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(next_frame(&mut responsive).await["type"], "pong");
    wait_until(|| {
        state
            .hub
            .connection(&responsive_id)
            .map_or(false, |c| c.is_alive)
    })
    .await;

    let terminated = state.hub.heartbeat_tick();
    assert_eq!(terminated, vec![silent_id.clone()]);
    assert!(state.hub.connection(&silent_id).is_none());
    assert!(state.hub.connection(&responsive_id).is_some());

    // The server closes the terminated socket.
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match silent.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
    assert_eq!(state.hub.connection_count(), 1);
}

#[tokio::test]
async fn test_unified_paths_pick_the_channel() {
    let state = create_test_server_state(WsMode::Unified);
    let addr = spawn_server(&state).await;

    let mut notifications = connect(addr, "/ws/notifications").await;
    let greeting = next_frame(&mut notifications).await;
    assert_eq!(greeting["type"], "connection_established");
    assert_eq!(greeting["channel"], "notifications");

    let mut realtime = connect(addr, "/ws/realtime/").await;
    assert_eq!(next_frame(&mut realtime).await["channel"], "realtime");

    let mut alerts = connect(addr, "/ws/alerts").await;
    assert_eq!(next_frame(&mut alerts).await["channel"], "alerts");
    assert_eq!(next_frame(&mut alerts).await["type"], "active_alerts");

    wait_until(|| state.hub.connection_count() == 3).await;
    assert_eq!(state.hub.channel_count(ChannelKind::Notifications), 1);
    assert_eq!(state.hub.channel_count(ChannelKind::Realtime), 1);

    notifications
        .send(Message::Text(r#"{"type":"get_metrics"}"#.to_string()))
        .await
        .unwrap();
    let frame = next_frame(&mut notifications).await;
    assert_eq!(frame["type"], "error");
    assert!(frame["message"].as_str().unwrap().contains("get_metrics"));

    match connect_async(format!("ws://{}/ws/bogus", addr)).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 404),
        other => panic!("expected a 404 upgrade rejection, got {:?}", other.map(|_| ())),
    }
    assert_eq!(state.hub.connection_count(), 3);
}
