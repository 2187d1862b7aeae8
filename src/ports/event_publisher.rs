//! EventPublisher port - Interface for publishing domain events.
//!
//! This port defines how the application publishes events without
//! knowing about the underlying dispatch mechanism.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must ensure:
/// - `publish` never blocks on subscriber work: it is fire-and-forget,
///   so a request handler that publishes does not wait for delivery
/// - Events with no subscribers are silently dropped
/// - Errors reported are publish-side only (handler failures are logged
///   by the implementation, never surfaced to the publisher)
///
/// # Example
///
/// ```ignore
/// let envelope = EventEnvelope::from_event(&event);
/// publisher.publish(envelope).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish multiple events in order.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
