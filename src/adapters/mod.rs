//! Adapters - Implementations of the ports against real infrastructure.
//!
//! - `events` - In-process event bus (fire-and-forget dispatch)
//! - `http` - REST surface for the consultation lifecycle
//! - `memory` - In-memory repository for tests and development
//! - `postgres` - PostgreSQL repository with conditional status writes
//! - `websocket` - Room registry, signaling relay, push event bridge

pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;

pub use events::InProcessEventBus;
pub use memory::InMemoryConsultationRepository;
pub use postgres::PostgresConsultationRepository;
pub use websocket::{PushEventBridge, RoomRegistry, SignalingRelay, WebSocketState};
