// crates/server/src/routes/live.rs
//! `GET /ws`: WebSocket feed of progress events.
//!
//! The socket is send-only from the server's side. Inbound frames are read
//! just to notice when the browser goes away.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

/// Protocol-level ping so half-open TCP connections are noticed.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (client_id, mut rx) = state.hub.register();

    let mut forward_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        // Skip the first immediate tick
        heartbeat.tick().await;

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(payload) = event else { break };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(client_id, error = %e, "WebSocket receive error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = &mut forward_task => {
                tracing::debug!(client_id, "WebSocket send side closed");
                break;
            }
        }
    }

    forward_task.abort();
    state.hub.unregister(client_id);
}
