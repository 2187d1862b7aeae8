//! Signaling relay - forwards messages between the connections in a room.
//!
//! The relay is content-blind: offer, answer, ICE candidate, hand-raise
//! and chat all go through the same `forward` primitive. It checks only
//! that the sender actually joined the room, then delivers either to
//! one named connection (unicast) or to every other member (broadcast).
//!
//! Delivery is at-most-once with no relay-side retry. A unicast whose
//! target has disconnected is dropped silently - the sender observes
//! the room's `peer_left` event instead of an error frame, and its own
//! timeout is the signal that an expected reply is not coming.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, RoomId};

use super::messages::ServerMessage;
use super::rooms::{ConnectionId, RoomRegistry};

/// Forwards room-scoped messages without interpreting their payloads.
pub struct SignalingRelay {
    registry: Arc<RoomRegistry>,
}

impl SignalingRelay {
    /// Creates a relay over the given registry.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Forward a message from `sender` within `room_id`.
    ///
    /// With a `target`, delivers to exactly that connection (and nobody
    /// else); without one, broadcasts to every member except the
    /// sender. FIFO ordering holds per sending connection (inherited
    /// from its transport channel); no ordering is guaranteed across
    /// different senders or message kinds.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the sender never joined the room
    pub fn forward(
        &self,
        sender: ConnectionId,
        room_id: RoomId,
        target: Option<ConnectionId>,
        message: ServerMessage,
    ) -> Result<(), DomainError> {
        if !self.registry.is_member(room_id, sender) {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Sender has not joined this room",
            )
            .with_detail("room_id", room_id.to_string()));
        }

        match target {
            Some(target) => {
                // Addressing is room-scoped: a target outside the room
                // is treated exactly like a disconnected one.
                if self.registry.is_member(room_id, target) {
                    self.registry.send_to_connection(target, message);
                } else {
                    tracing::trace!(%room_id, %target, "Unicast target gone, dropping");
                }
            }
            None => {
                self.registry.broadcast_to_room(room_id, message, Some(sender));
            }
        }
        Ok(())
    }
}
