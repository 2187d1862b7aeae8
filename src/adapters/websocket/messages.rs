//! WebSocket message types for the real-time consultation channel.
//!
//! Defines the protocol between server and connected clients as closed
//! tagged unions dispatched through a single entry point, so every
//! message kind is handled (or deliberately ignored) exhaustively:
//! - Client -> Server: room membership, signaling, room-scoped events
//! - Server -> Client: connection status, peer membership, relayed
//!   signaling, push notifications
//!
//! The relay never interprets `payload` contents - offer, answer and
//! ICE candidates are opaque blobs the two browsers exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::RoomId;

use super::rooms::ConnectionId;

// ============================================
// Client → Server Messages
// ============================================

/// Signaling payload addressed within a room.
///
/// `target_connection_id` selects unicast delivery; without it the
/// message is broadcast to every other room member (used for the very
/// first offer, before the sender has learned the peer's identity from
/// `peer_joined` or a relayed message).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    pub room_id: RoomId,
    pub payload: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_connection_id: Option<ConnectionId>,
}

/// All message types that can be received from a client.
///
/// The caller's identity is bound at handshake time and never read from
/// message bodies, so a client cannot speak as someone else.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room (idempotent; repeated joins are no-ops).
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },

    /// Leave a room.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId },

    /// Session description offer, relayed opaquely.
    Offer(SignalPayload),

    /// Session description answer, relayed opaquely.
    Answer(SignalPayload),

    /// ICE candidate, relayed opaquely.
    IceCandidate(SignalPayload),

    /// Hand-raise toggle, broadcast to the room.
    #[serde(rename_all = "camelCase")]
    HandRaise { room_id: RoomId, raised: bool },

    /// Recording-consent change notice, broadcast to the room.
    ///
    /// This is UI signaling only; the authoritative consent flags are
    /// written through the REST surface.
    #[serde(rename_all = "camelCase")]
    ConsentChanged { room_id: RoomId, value: bool },

    /// Free-text chat, broadcast to the room. Not persisted here.
    #[serde(rename_all = "camelCase")]
    ChatMessage { room_id: RoomId, text: String },

    /// Heartbeat request.
    Ping,
}

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established; tells the client its connection id.
    #[serde(rename_all = "camelCase")]
    Connected {
        connection_id: ConnectionId,
        timestamp: String,
    },

    /// Another connection joined a room this client is in.
    #[serde(rename_all = "camelCase")]
    PeerJoined {
        room_id: RoomId,
        connection_id: ConnectionId,
    },

    /// A connection left a room this client is in (explicitly or by
    /// disconnect).
    #[serde(rename_all = "camelCase")]
    PeerLeft {
        room_id: RoomId,
        connection_id: ConnectionId,
    },

    /// Relayed session description offer.
    #[serde(rename_all = "camelCase")]
    Offer {
        room_id: RoomId,
        from: ConnectionId,
        payload: JsonValue,
    },

    /// Relayed session description answer.
    #[serde(rename_all = "camelCase")]
    Answer {
        room_id: RoomId,
        from: ConnectionId,
        payload: JsonValue,
    },

    /// Relayed ICE candidate.
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        room_id: RoomId,
        from: ConnectionId,
        payload: JsonValue,
    },

    /// Relayed hand-raise toggle.
    #[serde(rename_all = "camelCase")]
    HandRaise {
        room_id: RoomId,
        from: ConnectionId,
        raised: bool,
    },

    /// Relayed consent-change notice.
    #[serde(rename_all = "camelCase")]
    ConsentChanged {
        room_id: RoomId,
        from: ConnectionId,
        value: bool,
    },

    /// Relayed chat message, stamped server-side.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: RoomId,
        sender: String,
        text: String,
        timestamp: String,
    },

    /// Pushed notification for this client's user.
    #[serde(rename_all = "camelCase")]
    Notification { payload: JsonValue, timestamp: String },

    /// Pushed message for a conversation room this client joined.
    #[serde(rename_all = "camelCase")]
    ConversationMessage {
        room_id: RoomId,
        payload: JsonValue,
        timestamp: String,
    },

    /// Heartbeat response.
    #[serde(rename_all = "camelCase")]
    Pong { timestamp: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_deserializes() {
        let json = r#"{"type": "join_room", "roomId": "550e8400-e29b-41d4-a716-446655440000"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::JoinRoom { .. }));
    }

    #[test]
    fn offer_deserializes_with_optional_target() {
        let json = r#"{
            "type": "offer",
            "roomId": "550e8400-e29b-41d4-a716-446655440000",
            "payload": {"sdp": "v=0..."}
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Offer(signal) => {
                assert!(signal.target_connection_id.is_none());
                assert_eq!(signal.payload["sdp"], "v=0...");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn answer_deserializes_with_target() {
        let json = r#"{
            "type": "answer",
            "roomId": "550e8400-e29b-41d4-a716-446655440000",
            "payload": {},
            "targetConnectionId": "650e8400-e29b-41d4-a716-446655440000"
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Answer(signal) => assert!(signal.target_connection_id.is_some()),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn ping_deserializes() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn peer_joined_serializes_with_type_tag() {
        let msg = ServerMessage::PeerJoined {
            room_id: RoomId::new(),
            connection_id: ConnectionId::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"peer_joined""#));
        assert!(json.contains(r#""connectionId""#));
    }

    #[test]
    fn relayed_offer_carries_sender() {
        let from = ConnectionId::new();
        let msg = ServerMessage::Offer {
            room_id: RoomId::new(),
            from,
            payload: serde_json::json!({"sdp": "..."}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(&from.to_string()));
        assert!(json.contains(r#""type":"offer""#));
    }

    #[test]
    fn chat_message_deserializes() {
        let json = r#"{
            "type": "chat_message",
            "roomId": "550e8400-e29b-41d4-a716-446655440000",
            "text": "hello"
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::ChatMessage { text, .. } => assert_eq!(text, "hello"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_client_message_type_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type": "mystery"}"#);
        assert!(result.is_err());
    }
}
