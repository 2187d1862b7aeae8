//! WebSocket upgrade handler for the real-time consultation channel.
//!
//! Handles the HTTP -> WebSocket upgrade and the connection lifecycle:
//! 1. Bind the connection to its user (identity from the upstream
//!    auth gateway)
//! 2. Upgrade to WebSocket and register with the room registry
//! 3. Run the send/receive loops, dispatching every inbound frame
//!    through a single exhaustive `dispatch` on the message union
//! 4. On disconnect (close frame, error, or drop), unregister - an
//!    implicit leave of every joined room

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::WebSocketConfig;
use crate::domain::foundation::{Timestamp, UserId};

use super::messages::{ClientMessage, ServerMessage};
use super::relay::SignalingRelay;
use super::rooms::{ConnectionId, RoomRegistry};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<RoomRegistry>,
    pub relay: Arc<SignalingRelay>,
    max_chat_len: usize,
}

impl WebSocketState {
    /// Create state over a shared registry with default limits.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self::with_config(registry, &WebSocketConfig::default())
    }

    /// Create state with explicit channel limits.
    pub fn with_config(registry: Arc<RoomRegistry>, config: &WebSocketConfig) -> Self {
        let relay = Arc::new(SignalingRelay::new(registry.clone()));
        Self {
            registry,
            relay,
            max_chat_len: config.max_chat_len,
        }
    }
}

/// Handshake parameters.
///
/// Authentication is owned by the upstream gateway, which terminates
/// the token and forwards the resolved user id.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub user_id: String,
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /api/ws?user_id=...`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<WebSocketState>,
) -> Response {
    let user_id = match UserId::new(params.user_id) {
        Ok(id) => id,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body("Missing user identity".into())
                .unwrap();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle an established WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, user_id: UserId, state: WebSocketState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Per-connection outbound channel. Registry writes are unbounded
    // sends, so nothing inside the registry ever blocks on this
    // socket; FIFO order per sender is preserved by the channel.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let connection_id = state.registry.register(user_id.clone(), tx);

    tracing::info!(%connection_id, user_id = %user_id, "WebSocket connected");

    state.registry.send_to_connection(
        connection_id,
        ServerMessage::Connected {
            connection_id,
            timestamp: Timestamp::now().to_rfc3339(),
        },
    );

    // Forward queued outbound messages to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = serde_json::to_string(&message)
                .expect("ServerMessage serialization should not fail");
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Receive loop: every frame goes through the one dispatch point.
    let recv_state = state.clone();
    let recv_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => dispatch(&recv_state, connection_id, &recv_user, message),
                    Err(e) => {
                        tracing::debug!(%connection_id, error = %e, "Unparseable client message");
                    }
                },
                Ok(Message::Binary(_)) => {
                    tracing::warn!(%connection_id, "Binary messages not supported");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level frames, handled by axum.
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(%connection_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%connection_id, error = %e, "Receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Implicit leave of every room + release of the user binding.
    state.registry.unregister(connection_id);
    tracing::info!(%connection_id, "WebSocket disconnected");
}

/// Single dispatch point over the closed client-message union.
///
/// Relay rejections (e.g. signaling into a room the sender never
/// joined) are logged, never echoed down the channel as error frames -
/// the absence of an expected reply is the client's own timeout signal.
fn dispatch(
    state: &WebSocketState,
    connection_id: ConnectionId,
    user_id: &UserId,
    message: ClientMessage,
) {
    let result = match message {
        ClientMessage::JoinRoom { room_id } => {
            state.registry.join(room_id, connection_id);
            Ok(())
        }
        ClientMessage::LeaveRoom { room_id } => {
            state.registry.leave(room_id, connection_id);
            Ok(())
        }
        ClientMessage::Offer(signal) => state.relay.forward(
            connection_id,
            signal.room_id,
            signal.target_connection_id,
            ServerMessage::Offer {
                room_id: signal.room_id,
                from: connection_id,
                payload: signal.payload,
            },
        ),
        ClientMessage::Answer(signal) => state.relay.forward(
            connection_id,
            signal.room_id,
            signal.target_connection_id,
            ServerMessage::Answer {
                room_id: signal.room_id,
                from: connection_id,
                payload: signal.payload,
            },
        ),
        ClientMessage::IceCandidate(signal) => state.relay.forward(
            connection_id,
            signal.room_id,
            signal.target_connection_id,
            ServerMessage::IceCandidate {
                room_id: signal.room_id,
                from: connection_id,
                payload: signal.payload,
            },
        ),
        ClientMessage::HandRaise { room_id, raised } => state.relay.forward(
            connection_id,
            room_id,
            None,
            ServerMessage::HandRaise {
                room_id,
                from: connection_id,
                raised,
            },
        ),
        ClientMessage::ConsentChanged { room_id, value } => state.relay.forward(
            connection_id,
            room_id,
            None,
            ServerMessage::ConsentChanged {
                room_id,
                from: connection_id,
                value,
            },
        ),
        ClientMessage::ChatMessage { room_id, text } => {
            if text.chars().count() > state.max_chat_len {
                tracing::debug!(%connection_id, "Oversized chat message dropped");
                Ok(())
            } else {
                state.relay.forward(
                    connection_id,
                    room_id,
                    None,
                    ServerMessage::ChatMessage {
                        room_id,
                        sender: user_id.to_string(),
                        text,
                        timestamp: Timestamp::now().to_rfc3339(),
                    },
                )
            }
        }
        ClientMessage::Ping => {
            state.registry.send_to_connection(
                connection_id,
                ServerMessage::Pong {
                    timestamp: Timestamp::now().to_rfc3339(),
                },
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(%connection_id, error = %e, "Dropped client message");
    }
}

/// Create the axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}
