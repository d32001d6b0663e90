//! WebSocket handler for live session status

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::StatusView;
use crate::state::AppState;

/// WebSocket message types
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    #[serde(rename = "status")]
    Status(StatusView),
    #[serde(rename = "pong")]
    Pong,
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &WsMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(error = %e, "Failed to encode WebSocket message");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.controller.subscribe();

    info!("WebSocket client connected");

    // Send current status on connect
    let current = {
        let report = updates.borrow_and_update().clone();
        WsMessage::Status(StatusView::new(report, state.frame_loop.frames_rendered()))
    };
    if let Some(msg) = encode(&current) {
        if sender.send(msg).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            // Forward status changes to client
            changed = updates.changed() => {
                if let Err(e) = changed {
                    debug!(error = %e, "Status channel closed");
                    break;
                }
                let report = updates.borrow_and_update().clone();
                let msg = WsMessage::Status(StatusView::new(
                    report,
                    state.frame_loop.frames_rendered(),
                ));
                if let Some(msg) = encode(&msg) {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
            }

            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        // Handle ping/pong for keepalive
                        if text.as_str() == "ping" {
                            if let Some(pong) = encode(&WsMessage::Pong) {
                                if sender.send(pong).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
