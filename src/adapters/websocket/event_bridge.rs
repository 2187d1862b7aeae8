//! Event bridge connecting domain events to WebSocket clients.
//!
//! Subscribes to push-relevant events and delivers them to whichever
//! connections are currently subscribed:
//!
//! - `notification.created` -> every live connection of the recipient
//!   user (bound at handshake time, independent of consultation rooms)
//! - `message.created` -> every connection joined to the conversation's
//!   room
//!
//! The REST handler that created the record publishes and moves on; the
//! bus dispatches this bridge off that handler's path, and with zero
//! live recipients the event is silently dropped. The persisted record
//! remains queryable on next login - durability is the store's job, not
//! this bridge's.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope, RoomId, UserId};
use crate::ports::{EventHandler, EventSubscriber};

use super::messages::ServerMessage;
use super::rooms::RoomRegistry;

/// Event types this bridge pushes to connected clients.
pub const PUSH_EVENT_TYPES: &[&str] = &["notification.created", "message.created"];

/// Bridge between the event bus and live WebSocket connections.
pub struct PushEventBridge {
    registry: Arc<RoomRegistry>,
}

impl PushEventBridge {
    /// Create a new bridge over the given registry.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Create as an Arc (for sharing with an event subscriber).
    pub fn new_shared(registry: Arc<RoomRegistry>) -> Arc<Self> {
        Arc::new(Self::new(registry))
    }

    /// Register this bridge with an event subscriber.
    pub fn register(self: &Arc<Self>, subscriber: &impl EventSubscriber) {
        subscriber.subscribe_all(PUSH_EVENT_TYPES, self.clone());
    }

    /// Recipient user for a notification event.
    fn resolve_recipient(event: &EventEnvelope) -> Option<UserId> {
        event
            .payload
            .get("recipient_id")
            .and_then(|v| v.as_str())
            .and_then(|s| UserId::new(s).ok())
    }

    /// Conversation room for a message event.
    fn resolve_conversation(event: &EventEnvelope) -> Option<RoomId> {
        event
            .payload
            .get("conversation_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

#[async_trait]
impl EventHandler for PushEventBridge {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        match event.event_type.as_str() {
            "notification.created" => {
                let Some(recipient) = Self::resolve_recipient(&event) else {
                    tracing::debug!(
                        event_type = %event.event_type,
                        event_id = %event.event_id,
                        "Notification event without recipient_id, skipping push"
                    );
                    return Ok(());
                };

                let delivered = self.registry.send_to_user(
                    &recipient,
                    ServerMessage::Notification {
                        payload: event.payload,
                        timestamp: event.occurred_at.to_rfc3339(),
                    },
                );
                if delivered == 0 {
                    tracing::trace!(recipient = %recipient, "Recipient offline, notification dropped");
                }
            }
            "message.created" => {
                let Some(room_id) = Self::resolve_conversation(&event) else {
                    tracing::debug!(
                        event_type = %event.event_type,
                        event_id = %event.event_id,
                        "Message event without conversation_id, skipping push"
                    );
                    return Ok(());
                };

                self.registry.broadcast_to_room(
                    room_id,
                    ServerMessage::ConversationMessage {
                        room_id,
                        payload: event.payload,
                        timestamp: event.occurred_at.to_rfc3339(),
                    },
                    None,
                );
            }
            _ => {
                // Not a push-relevant event.
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "PushEventBridge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InProcessEventBus;
    use crate::ports::EventPublisher;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn connect(registry: &RoomRegistry, user: &str) -> UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(UserId::new(user).unwrap(), tx);
        rx
    }

    fn notification_event(recipient: &str) -> EventEnvelope {
        EventEnvelope::new(
            "notification.created",
            "notification-1",
            "Notification",
            json!({
                "recipient_id": recipient,
                "title": "Consultation starting soon"
            }),
        )
    }

    fn message_event(conversation_id: &RoomId) -> EventEnvelope {
        EventEnvelope::new(
            "message.created",
            "message-1",
            "Message",
            json!({
                "conversation_id": conversation_id.to_string(),
                "body": "Please upload the tenancy agreement"
            }),
        )
    }

    #[tokio::test]
    async fn notification_reaches_all_recipient_connections() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = PushEventBridge::new(registry.clone());

        let mut tab_1 = connect(&registry, "citizen-1");
        let mut tab_2 = connect(&registry, "citizen-1");
        let mut other = connect(&registry, "paralegal-1");

        bridge.handle(notification_event("citizen-1")).await.unwrap();

        assert!(matches!(
            tab_1.try_recv().unwrap(),
            ServerMessage::Notification { .. }
        ));
        assert!(tab_2.try_recv().is_ok());
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn notification_for_offline_recipient_is_dropped() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = PushEventBridge::new(registry);

        // No connections at all: still Ok.
        let result = bridge.handle(notification_event("citizen-1")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn conversation_message_reaches_room_members() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = PushEventBridge::new(registry.clone());

        let conversation = RoomId::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let a = registry.register(UserId::new("citizen-1").unwrap(), tx_a);
        registry.join(conversation, a);
        let mut outside = connect(&registry, "paralegal-1");

        bridge.handle(message_event(&conversation)).await.unwrap();

        assert!(matches!(
            rx_a.try_recv().unwrap(),
            ServerMessage::ConversationMessage { room_id, .. } if room_id == conversation
        ));
        assert!(outside.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped_without_error() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = PushEventBridge::new(registry);

        let event = EventEnvelope::new(
            "notification.created",
            "notification-1",
            "Notification",
            json!({"title": "no recipient field"}),
        );
        assert!(bridge.handle(event).await.is_ok());
    }

    #[tokio::test]
    async fn registered_bridge_receives_bus_events() {
        let registry = Arc::new(RoomRegistry::new());
        let bus = Arc::new(InProcessEventBus::new());
        let bridge = PushEventBridge::new_shared(registry.clone());
        bridge.register(bus.as_ref());

        let mut rx = connect(&registry, "citizen-1");

        bus.publish(notification_event("citizen-1")).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("bridge should have delivered the push")
            .unwrap();
        assert!(matches!(received, ServerMessage::Notification { .. }));
    }
}
