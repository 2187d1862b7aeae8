//! SubmitFeedbackHandler - records citizen feedback on a completed
//! consultation.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationError, FeedbackSubmitted};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, ConsultationStatus, EventEnvelope, EventId, FeedbackRating,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to submit feedback. The caller comes from request identity,
/// not the request body - only the citizen party is accepted.
#[derive(Debug, Clone)]
pub struct SubmitFeedbackCommand {
    pub consultation_id: ConsultationId,
    pub rating: FeedbackRating,
    pub comment: Option<String>,
}

/// Handler for feedback submission.
pub struct SubmitFeedbackHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SubmitFeedbackHandler {
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
        cmd: SubmitFeedbackCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let mut consultation = self
            .repository
            .find_by_id(&cmd.consultation_id)
            .await?
            .ok_or_else(|| ConsultationError::not_found(cmd.consultation_id))?;

        consultation.submit_feedback(&metadata.user_id, cmd.rating, cmd.comment)?;

        // Feedback only exists on completed consultations; the status
        // check doubles as the concurrency guard since Completed is
        // absorbing.
        if !self
            .repository
            .update_if_status(&consultation, ConsultationStatus::Completed)
            .await?
        {
            return Err(ConsultationError::invalid_state(
                "Consultation changed while submitting feedback".to_string(),
            ));
        }

        let event = FeedbackSubmitted {
            event_id: EventId::new(),
            consultation_id: *consultation.id(),
            rating: cmd.rating,
            submitted_at: *consultation.updated_at(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::info!(
            consultation_id = %consultation.id(),
            rating = cmd.rating.value(),
            "Feedback submitted"
        );

        Ok(consultation)
    }
}
