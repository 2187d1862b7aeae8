//! WebSocket adapters for the real-time consultation channel.
//!
//! Infrastructure for peer-to-peer signaling and push delivery:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     InProcessEventBus                       │
//! │  notification.created / message.created from REST handlers  │
//! └─────────────────────────────────────────────────────────────┘
//!                             │ subscribes
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PushEventBridge                        │
//! │  routes to user bindings / conversation rooms               │
//! └─────────────────────────────────────────────────────────────┘
//!                             │ delivers via
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RoomRegistry                          │
//! │  Room: consult-123     Room: consult-456    users: {...}    │
//! │  ├── conn-a            ├── conn-c                           │
//! │  └── conn-b            └── conn-d                           │
//! └─────────────────────────────────────────────────────────────┘
//!                             ▲
//!                             │ forwards through
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SignalingRelay                         │
//! │  offer / answer / ICE / hand-raise / chat, content-blind    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Closed tagged-union wire protocol
//! - [`rooms`] - Connection, room, and user-binding registry
//! - [`relay`] - Unicast/broadcast forwarding within a room
//! - [`handler`] - Axum WebSocket upgrade handler and dispatch loop
//! - [`event_bridge`] - Push delivery for bus events

pub mod event_bridge;
pub mod handler;
pub mod messages;
pub mod relay;
pub mod rooms;

pub use event_bridge::{PushEventBridge, PUSH_EVENT_TYPES};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientMessage, ServerMessage, SignalPayload};
pub use relay::SignalingRelay;
pub use rooms::{ConnectionId, RoomRegistry};
