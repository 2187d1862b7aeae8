//! Room registry for connection grouping and message delivery.
//!
//! The registry is an explicitly owned instance injected into the
//! signaling relay and the push event bridge. It tracks three things:
//!
//! - live connections and their outbound channels
//! - room membership (`RoomId` -> set of connections), created on first
//!   join and discarded when the last member leaves
//! - user bindings (`UserId` -> set of connections), made once per
//!   connection at handshake time for notification push
//!
//! Membership is ephemeral. A process restart loses all of it, which is
//! acceptable because clients re-join on reconnect.
//!
//! # Concurrency
//!
//! All three maps are `DashMap`s, so a join/leave holds only the one
//! room's entry lock while it mutates the member set and snapshots the
//! broadcast recipients - different rooms never contend and no global
//! lock exists. Guards from different maps are never held at the same
//! time (recipient snapshots are taken first, sends happen after the
//! guard is dropped), which keeps the registry deadlock-free.
//!
//! # Idempotent join
//!
//! `join` is set-based: a duplicate join (reconnect storm, retried
//! message) leaves the member set unchanged and broadcasts nothing, so
//! `peer_joined` reaches each other member exactly once per actual new
//! membership and clients never need to deduplicate peers themselves.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::foundation::{RoomId, UserId};

use super::messages::ServerMessage;

/// Unique identifier for a WebSocket connection.
///
/// Generated server-side when a client connects; peers learn each
/// other's ids from `peer_joined` events and relayed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Outbound channel half for one connection.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

struct ConnectionEntry {
    user_id: UserId,
    sender: OutboundSender,
    rooms: HashSet<RoomId>,
}

/// Registry of live connections, room membership, and user bindings.
#[derive(Default)]
pub struct RoomRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    users: DashMap<UserId, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new connection and bind it to its user.
    ///
    /// Called once per connection at handshake time. Returns the
    /// server-generated connection id.
    pub fn register(&self, user_id: UserId, sender: OutboundSender) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                user_id: user_id.clone(),
                sender,
                rooms: HashSet::new(),
            },
        );
        self.users
            .entry(user_id)
            .or_default()
            .insert(connection_id);

        tracing::debug!(%connection_id, "Connection registered");
        connection_id
    }

    /// Remove a connection entirely.
    ///
    /// Performs an implicit `leave` for every room the connection
    /// belonged to (broadcasting `peer_left` to remaining members) and
    /// releases the user binding. Transport disconnects route here, so
    /// a network drop and an explicit close behave identically.
    pub fn unregister(&self, connection_id: ConnectionId) {
        let Some((_, entry)) = self.connections.remove(&connection_id) else {
            return;
        };

        for room_id in entry.rooms {
            self.remove_membership(room_id, connection_id);
        }

        if let Entry::Occupied(mut occupied) = self.users.entry(entry.user_id) {
            occupied.get_mut().remove(&connection_id);
            if occupied.get().is_empty() {
                occupied.remove();
            }
        }

        tracing::debug!(%connection_id, "Connection unregistered");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Room membership
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a connection to a room, creating the room on first join.
    ///
    /// Returns `true` when membership actually changed; in that case
    /// `peer_joined` was broadcast to every *other* member. A duplicate
    /// join returns `false` and broadcasts nothing. Joining from an
    /// unregistered connection is ignored (`false`).
    pub fn join(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        {
            let Some(mut entry) = self.connections.get_mut(&connection_id) else {
                return false;
            };
            entry.rooms.insert(room_id);
        }

        let others: Vec<ConnectionId> = {
            let mut members = self.rooms.entry(room_id).or_default();
            if !members.insert(connection_id) {
                // Already a member: no membership change, no re-broadcast.
                return false;
            }
            members
                .iter()
                .copied()
                .filter(|member| *member != connection_id)
                .collect()
        };

        // A disconnect may race the join; undo rather than leak a dead
        // member in the room set.
        if !self.connections.contains_key(&connection_id) {
            self.remove_membership(room_id, connection_id);
            return false;
        }

        tracing::debug!(%room_id, %connection_id, peers = others.len(), "Joined room");

        let notice = ServerMessage::PeerJoined {
            room_id,
            connection_id,
        };
        for member in others {
            self.send_to_connection(member, notice.clone());
        }
        true
    }

    /// Remove a connection from a room.
    ///
    /// Broadcasts `peer_left` to the remaining members and discards the
    /// room entry once it is empty. Returns `true` when membership
    /// actually changed.
    pub fn leave(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        if let Some(mut entry) = self.connections.get_mut(&connection_id) {
            entry.rooms.remove(&room_id);
        }
        self.remove_membership(room_id, connection_id)
    }

    /// Whether a connection is currently a member of a room.
    pub fn is_member(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        self.rooms
            .get(&room_id)
            .map(|members| members.contains(&connection_id))
            .unwrap_or(false)
    }

    /// Current members of a room.
    pub fn members(&self, room_id: RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delivery
    // ─────────────────────────────────────────────────────────────────────────

    /// Send to one connection. Returns `false` if the connection is
    /// gone - the message is dropped silently; senders observe the
    /// corresponding `peer_left` instead of an error.
    pub fn send_to_connection(&self, connection_id: ConnectionId, message: ServerMessage) -> bool {
        match self.connections.get(&connection_id) {
            Some(entry) => entry.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Broadcast to every member of a room, optionally excluding one
    /// connection (the sender). Returns the number of deliveries.
    pub fn broadcast_to_room(
        &self,
        room_id: RoomId,
        message: ServerMessage,
        except: Option<ConnectionId>,
    ) -> usize {
        let recipients: Vec<ConnectionId> = {
            match self.rooms.get(&room_id) {
                Some(members) => members
                    .iter()
                    .copied()
                    .filter(|member| Some(*member) != except)
                    .collect(),
                None => return 0,
            }
        };

        recipients
            .into_iter()
            .filter(|recipient| self.send_to_connection(*recipient, message.clone()))
            .count()
    }

    /// Deliver to every live connection bound to a user. Returns the
    /// number of deliveries; zero when the user has no connections (the
    /// message is dropped, durability lives in the persisted store).
    pub fn send_to_user(&self, user_id: &UserId, message: ServerMessage) -> usize {
        let recipients: Vec<ConnectionId> = {
            match self.users.get(user_id) {
                Some(connections) => connections.iter().copied().collect(),
                None => return 0,
            }
        };

        recipients
            .into_iter()
            .filter(|recipient| self.send_to_connection(*recipient, message.clone()))
            .count()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove a member from a room's set, notify the remainder, and
    /// garbage-collect the room when empty.
    fn remove_membership(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        let remaining: Option<Vec<ConnectionId>> = match self.rooms.entry(room_id) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get_mut().remove(&connection_id) {
                    None
                } else if occupied.get().is_empty() {
                    occupied.remove();
                    Some(Vec::new())
                } else {
                    Some(occupied.get().iter().copied().collect())
                }
            }
            Entry::Vacant(_) => None,
        };

        let Some(remaining) = remaining else {
            return false;
        };

        tracing::debug!(%room_id, %connection_id, "Left room");

        let notice = ServerMessage::PeerLeft {
            room_id,
            connection_id,
        };
        for member in remaining {
            self.send_to_connection(member, notice.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Client {
        id: ConnectionId,
        rx: UnboundedReceiver<ServerMessage>,
    }

    fn connect(registry: &RoomRegistry, user: &str) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(UserId::new(user).unwrap(), tx);
        Client { id, rx }
    }

    fn drain(client: &mut Client) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = client.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn join_creates_room_and_tracks_members() {
        let registry = RoomRegistry::new();
        let room = RoomId::new();
        let a = connect(&registry, "user-a");
        let b = connect(&registry, "user-b");

        assert!(registry.join(room, a.id));
        assert!(registry.join(room, b.id));

        let mut members = registry.members(room);
        members.sort_by_key(|id| id.to_string());
        let mut expected = vec![a.id, b.id];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(members, expected);
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn join_broadcasts_peer_joined_to_existing_members_only() {
        let registry = RoomRegistry::new();
        let room = RoomId::new();
        let mut a = connect(&registry, "user-a");
        let mut b = connect(&registry, "user-b");

        registry.join(room, a.id);
        registry.join(room, b.id);

        // A (already in the room) hears about B; B hears nothing.
        let a_messages = drain(&mut a);
        assert_eq!(a_messages.len(), 1);
        assert!(matches!(
            a_messages[0],
            ServerMessage::PeerJoined { connection_id, .. } if connection_id == b.id
        ));
        assert!(drain(&mut b).is_empty());
    }

    #[tokio::test]
    async fn duplicate_join_changes_nothing_and_rebroadcasts_nothing() {
        let registry = RoomRegistry::new();
        let room = RoomId::new();
        let mut a = connect(&registry, "user-a");
        let b = connect(&registry, "user-b");

        registry.join(room, a.id);
        registry.join(room, b.id);
        drain(&mut a);

        // Reconnect storm: B joins again.
        assert!(!registry.join(room, b.id));

        assert_eq!(registry.members(room).len(), 2);
        assert!(drain(&mut a).is_empty());
    }

    #[tokio::test]
    async fn leave_notifies_remaining_and_discards_empty_room() {
        let registry = RoomRegistry::new();
        let room = RoomId::new();
        let mut a = connect(&registry, "user-a");
        let b = connect(&registry, "user-b");

        registry.join(room, a.id);
        registry.join(room, b.id);
        drain(&mut a);

        assert!(registry.leave(room, b.id));
        let a_messages = drain(&mut a);
        assert!(matches!(
            a_messages[..],
            [ServerMessage::PeerLeft { connection_id, .. }] if connection_id == b.id
        ));

        assert!(registry.leave(room, a.id));
        assert_eq!(registry.room_count(), 0);
        // Leaving a discarded room is a no-op.
        assert!(!registry.leave(room, a.id));
    }

    #[tokio::test]
    async fn unregister_leaves_all_rooms_and_releases_user_binding() {
        let registry = RoomRegistry::new();
        let room_1 = RoomId::new();
        let room_2 = RoomId::new();
        let a = connect(&registry, "user-a");
        let mut b = connect(&registry, "user-b");

        registry.join(room_1, a.id);
        registry.join(room_2, a.id);
        registry.join(room_1, b.id);
        drain(&mut b);

        registry.unregister(a.id);

        // B saw A leave room 1; room 2 is gone entirely.
        let b_messages = drain(&mut b);
        assert!(matches!(
            b_messages[..],
            [ServerMessage::PeerLeft { connection_id, .. }] if connection_id == a.id
        ));
        assert!(registry.members(room_2).is_empty());
        assert_eq!(
            registry.send_to_user(&UserId::new("user-a").unwrap(), ServerMessage::Pong {
                timestamp: "t".to_string()
            }),
            0
        );
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let room = RoomId::new();
        let mut a = connect(&registry, "user-a");
        let mut b = connect(&registry, "user-b");
        let mut c = connect(&registry, "user-c");

        registry.join(room, a.id);
        registry.join(room, b.id);
        registry.join(room, c.id);
        drain(&mut a);
        drain(&mut b);
        drain(&mut c);

        let delivered = registry.broadcast_to_room(
            room,
            ServerMessage::HandRaise {
                room_id: room,
                from: a.id,
                raised: true,
            },
            Some(a.id),
        );

        assert_eq!(delivered, 2);
        assert!(drain(&mut a).is_empty());
        assert_eq!(drain(&mut b).len(), 1);
        assert_eq!(drain(&mut c).len(), 1);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_reports_false() {
        let registry = RoomRegistry::new();
        let delivered = registry.send_to_connection(
            ConnectionId::new(),
            ServerMessage::Pong {
                timestamp: "t".to_string(),
            },
        );
        assert!(!delivered);
    }

    #[tokio::test]
    async fn send_to_user_reaches_all_of_their_connections() {
        let registry = RoomRegistry::new();
        let mut tab_1 = connect(&registry, "user-a");
        let mut tab_2 = connect(&registry, "user-a");

        let delivered = registry.send_to_user(
            &UserId::new("user-a").unwrap(),
            ServerMessage::Notification {
                payload: serde_json::json!({"title": "New document"}),
                timestamp: "t".to_string(),
            },
        );

        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut tab_1).len(), 1);
        assert_eq!(drain(&mut tab_2).len(), 1);
    }

    #[tokio::test]
    async fn join_from_unregistered_connection_is_ignored() {
        let registry = RoomRegistry::new();
        let room = RoomId::new();
        assert!(!registry.join(room, ConnectionId::new()));
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn operations_on_distinct_rooms_do_not_interfere() {
        let registry = RoomRegistry::new();
        let room_1 = RoomId::new();
        let room_2 = RoomId::new();
        let mut a = connect(&registry, "user-a");
        let b = connect(&registry, "user-b");

        registry.join(room_1, a.id);
        registry.join(room_2, b.id);

        registry.broadcast_to_room(
            room_2,
            ServerMessage::HandRaise {
                room_id: room_2,
                from: b.id,
                raised: true,
            },
            None,
        );

        // Nothing from room 2 reaches a member of room 1 only.
        assert!(drain(&mut a).is_empty());
    }
}
