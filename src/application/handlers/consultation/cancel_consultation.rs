//! CancelConsultationHandler - cancels a scheduled or running consultation.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationCancelled, ConsultationError};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, ConsultationStatus, EventEnvelope, EventId,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to cancel a consultation.
#[derive(Debug, Clone)]
pub struct CancelConsultationCommand {
    pub consultation_id: ConsultationId,
}

/// Handler for cancelling consultations.
pub struct CancelConsultationHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelConsultationHandler {
    pub fn new(
        repository: Arc<dyn ConsultationRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelConsultationCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let mut consultation = self.load(&cmd.consultation_id).await?;
        let prior = consultation.status();

        if !consultation.cancel()? {
            // Already cancelled.
            return Ok(consultation);
        }

        if !self
            .repository
            .update_if_status(&consultation, prior)
            .await?
        {
            let current = self.load(&cmd.consultation_id).await?;
            return if current.status() == ConsultationStatus::Cancelled {
                Ok(current)
            } else {
                // A completed consultation cannot retroactively be
                // cancelled, and a start that won the race means the
                // caller must re-decide.
                Err(ConsultationError::invalid_state(format!(
                    "Cannot cancel a consultation with status '{}'",
                    current.status()
                )))
            };
        }

        let event = ConsultationCancelled {
            event_id: EventId::new(),
            consultation_id: *consultation.id(),
            cancelled_at: *consultation.updated_at(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::info!(consultation_id = %consultation.id(), "Consultation cancelled");

        Ok(consultation)
    }

    async fn load(&self, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ConsultationError::not_found(*id))
    }
}
