//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ConsultationRepository` - Persistence for the consultation store
//!   (conditional status writes close the concurrent-start race)
//! - `EventPublisher` / `EventSubscriber` - The process-wide publish
//!   point that decouples request handlers from push delivery

mod consultation_repository;
mod event_publisher;
mod event_subscriber;

pub use consultation_repository::ConsultationRepository;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
