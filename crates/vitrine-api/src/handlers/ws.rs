//! WebSocket upgrade handlers.
//!
//! Each accepted socket is split: a writer task drains the connection's
//! outbound queue, the reader loop feeds frames to the hub.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{OriginalUri, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::ServerState;
use crate::models::ErrorResponse;
use crate::ws::{ChannelKind, ConnectionHub, Outbound};

/// `/ws/alerts` in dedicated mode.
pub async fn alerts_ws_handler(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, hub, ChannelKind::Alerts))
}

/// `/ws/realtime`, `/ws/notifications` and `/ws/alerts` in unified mode.
/// The channel is picked from the request path.
pub async fn unified_ws_handler(
    State(state): State<ServerState>,
    OriginalUri(uri): OriginalUri,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(channel) = ChannelKind::from_path(uri.path()) else {
        return ErrorResponse::not_found(format!("Canal WebSocket inconnu: {}", uri.path()))
            .into_response();
    };
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, hub, channel))
}

async fn serve_socket(socket: WebSocket, hub: ConnectionHub, channel: ChannelKind) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let id = hub.register(channel, tx);

    // Ends once the hub drops the connection's sender or the socket fails.
    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let (message, closing) = match outbound {
                Outbound::Text(text) => (Message::Text(text), false),
                Outbound::Ping => (Message::Ping(Vec::new()), false),
                Outbound::Close => (Message::Close(None), true),
            };
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => hub.handle_text(&id, &text),
                Some(Ok(Message::Binary(bytes))) => hub.handle_text(&id, &String::from_utf8_lossy(&bytes)),
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Ping(_))) => hub.mark_alive(&id),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(category = "ws", client_id = %id, error = %e, "WebSocket read failed");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    hub.unregister(&id);
    writer.abort();
}
