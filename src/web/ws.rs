//! Persistent streaming connection.
//!
//! A client receives `initial_state` on connect and a `state_update` each
//! time the broadcast loop drains the queue. Client frames carry
//! `request_state`, `control` or `ping`; anything else is answered with an
//! `error` frame and the connection stays open.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, info, warn};

use crate::{
    bridge::SimHandle,
    error::ProtocolError,
    protocol::{parse_client_message, ClientMessage, ControlAction, ServerMessage},
};

/// # Route
///
/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(handle): State<Arc<SimHandle>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, handle))
}

async fn handle_socket(mut socket: WebSocket, handle: Arc<SimHandle>) {
    let (id, mut rx) = handle.pipeline().subscribe();
    info!(subscriber = id, "observer connected");

    let snapshot = handle.snapshot().await;
    if let Some(json) = encode(&ServerMessage::InitialState { data: &snapshot }) {
        if socket.send(Message::Text(json)).await.is_err() {
            handle.pipeline().unsubscribe(id);
            return;
        }
    }

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!(subscriber = id, "subscriber pruned by broadcaster");
                    break;
                };
                if socket.send(Message::Text(frame.to_string())).await.is_err() {
                    debug!(subscriber = id, "send failed");
                    break;
                }
            }
            msg = socket.recv() => {
                let reply = match msg {
                    Some(Ok(Message::Text(text))) => handle_client_frame(&handle, &text).await,
                    Some(Ok(Message::Binary(_))) => {
                        encode(&ServerMessage::error(ProtocolError::Binary.to_string()))
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        None
                    }
                    Some(Ok(Message::Pong(_))) => None,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        debug!(subscriber = id, error = %err, "websocket error");
                        break;
                    }
                };
                if let Some(reply) = reply {
                    if socket.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    handle.pipeline().unsubscribe(id);
    info!(subscriber = id, "observer disconnected");
}

/// Produces the reply frame for one client text frame.
pub async fn handle_client_frame(handle: &SimHandle, text: &str) -> Option<String> {
    let message = match parse_client_message(text) {
        Ok(message) => message,
        Err(err) => return encode(&ServerMessage::error(err.to_string())),
    };
    match message {
        ClientMessage::RequestState => {
            let snapshot = handle.snapshot().await;
            encode(&ServerMessage::StateUpdate { data: &snapshot })
        }
        ClientMessage::Ping => encode(&ServerMessage::Pong),
        ClientMessage::Control { action } => {
            let action: ControlAction = match action.parse() {
                Ok(action) => action,
                Err(err) => return encode(&ServerMessage::error(err.to_string())),
            };
            let (success, message) = match handle.control(action).await {
                Ok(outcome) => (true, outcome.message().to_string()),
                Err(err) => (false, err.to_string()),
            };
            let (running, ended, _) = handle.status().await;
            encode(&ServerMessage::ControlAck {
                action: action.as_str().to_string(),
                success,
                message,
                running,
                ended,
            })
        }
    }
}

fn encode(message: &ServerMessage<'_>) -> Option<String> {
    match message.to_json() {
        Ok(json) => Some(json),
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
            None
        }
    }
}
