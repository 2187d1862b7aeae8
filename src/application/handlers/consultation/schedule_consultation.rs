//! ScheduleConsultationHandler - Command handler for scheduling consultations.
//!
//! Scheduling itself belongs to the surrounding case-management system;
//! this handler is the entry point it calls to create the record the
//! lifecycle operations act on.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationError, ConsultationScheduled};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, EventEnvelope, EventId, Timestamp, UserId,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to schedule a new consultation.
#[derive(Debug, Clone)]
pub struct ScheduleConsultationCommand {
    pub citizen_id: UserId,
    pub paralegal_id: UserId,
    pub scheduled_at: Timestamp,
}

/// Handler for scheduling consultations.
pub struct ScheduleConsultationHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ScheduleConsultationHandler {
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
        cmd: ScheduleConsultationCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let consultation = Consultation::schedule(
            ConsultationId::new(),
            cmd.citizen_id.clone(),
            cmd.paralegal_id.clone(),
            cmd.scheduled_at,
        )?;

        self.repository.insert(&consultation).await?;

        let event = ConsultationScheduled {
            event_id: EventId::new(),
            consultation_id: *consultation.id(),
            room_id: *consultation.room_id(),
            citizen_id: cmd.citizen_id,
            paralegal_id: cmd.paralegal_id,
            scheduled_at: cmd.scheduled_at,
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::info!(
            consultation_id = %consultation.id(),
            room_id = %consultation.room_id(),
            "Consultation scheduled"
        );

        Ok(consultation)
    }
}
