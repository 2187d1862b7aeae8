//! StartConsultationHandler - moves a consultation to in_progress.
//!
//! Both participants call this as they each join the call, frequently
//! within the same instant. The status write is a compare-and-swap on
//! the status the handler read; the loser of the race re-reads and
//! treats an already-started consultation as success, so neither
//! participant ever sees a spurious error on an otherwise good join.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationError, ConsultationStarted};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, ConsultationStatus, EventEnvelope, EventId,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to start a consultation.
#[derive(Debug, Clone)]
pub struct StartConsultationCommand {
    pub consultation_id: ConsultationId,
}

/// Handler for starting consultations.
pub struct StartConsultationHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl StartConsultationHandler {
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
        cmd: StartConsultationCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let mut consultation = self.load(&cmd.consultation_id).await?;
        let prior = consultation.status();

        if !consultation.start()? {
            // Already in progress: idempotent success, started_at untouched.
            return Ok(consultation);
        }

        if !self
            .repository
            .update_if_status(&consultation, prior)
            .await?
        {
            // Lost the race: the other participant transitioned first.
            // Their write decides the outcome; ours is only a success if
            // the consultation is in fact running now.
            let current = self.load(&cmd.consultation_id).await?;
            return if current.status() == ConsultationStatus::InProgress {
                Ok(current)
            } else {
                Err(ConsultationError::invalid_state(format!(
                    "Cannot start a consultation with status '{}'",
                    current.status()
                )))
            };
        }

        let event = ConsultationStarted {
            event_id: EventId::new(),
            consultation_id: *consultation.id(),
            room_id: *consultation.room_id(),
            started_at: *consultation
                .started_at()
                .unwrap_or(consultation.updated_at()),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::info!(consultation_id = %consultation.id(), "Consultation started");

        Ok(consultation)
    }

    async fn load(&self, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ConsultationError::not_found(*id))
    }
}
