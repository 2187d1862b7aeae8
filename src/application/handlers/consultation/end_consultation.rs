//! EndConsultationHandler - moves a consultation to completed.
//!
//! Clients call end defensively on every disconnect, so a repeat call
//! after completion is a no-op success with the stored end time and
//! duration, never an error.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationEnded, ConsultationError};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, ConsultationStatus, EventEnvelope, EventId,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to end a consultation.
#[derive(Debug, Clone)]
pub struct EndConsultationCommand {
    pub consultation_id: ConsultationId,
    pub notes: Option<String>,
}

/// Handler for ending consultations.
pub struct EndConsultationHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl EndConsultationHandler {
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
        cmd: EndConsultationCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let mut consultation = self.load(&cmd.consultation_id).await?;
        let prior = consultation.status();

        if !consultation.end(cmd.notes)? {
            // Already completed: ended_at and duration stand unchanged.
            return Ok(consultation);
        }

        if !self
            .repository
            .update_if_status(&consultation, prior)
            .await?
        {
            let current = self.load(&cmd.consultation_id).await?;
            return if current.status() == ConsultationStatus::Completed {
                Ok(current)
            } else {
                Err(ConsultationError::invalid_state(format!(
                    "Cannot end a consultation with status '{}'",
                    current.status()
                )))
            };
        }

        let event = ConsultationEnded {
            event_id: EventId::new(),
            consultation_id: *consultation.id(),
            duration_minutes: consultation.duration_minutes(),
            ended_at: *consultation.ended_at().unwrap_or(consultation.updated_at()),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::info!(
            consultation_id = %consultation.id(),
            duration_minutes = ?consultation.duration_minutes(),
            "Consultation ended"
        );

        Ok(consultation)
    }

    async fn load(&self, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ConsultationError::not_found(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryConsultationRepository, InProcessEventBus};
    use crate::domain::foundation::{Timestamp, UserId};

    struct Fixture {
        handler: EndConsultationHandler,
        repo: Arc<InMemoryConsultationRepository>,
        bus: Arc<InProcessEventBus>,
    }

    impl Fixture {
        fn new() -> Self {
            let repo = Arc::new(InMemoryConsultationRepository::new());
            let bus = Arc::new(InProcessEventBus::new());
            Self {
                handler: EndConsultationHandler::new(repo.clone(), bus.clone()),
                repo,
                bus,
            }
        }

        async fn in_progress(&self) -> Consultation {
            let mut consultation = Consultation::schedule(
                ConsultationId::new(),
                UserId::new("citizen-1").unwrap(),
                UserId::new("paralegal-1").unwrap(),
                Timestamp::now(),
            )
            .unwrap();
            self.repo.insert(&consultation).await.unwrap();
            consultation.start().unwrap();
            self.repo
                .update_if_status(&consultation, ConsultationStatus::Scheduled)
                .await
                .unwrap();
            consultation
        }
    }

    #[tokio::test]
    async fn end_completes_and_stores_notes() {
        let fixture = Fixture::new();
        let consultation = fixture.in_progress().await;

        let ended = fixture
            .handler
            .handle(
                EndConsultationCommand {
                    consultation_id: *consultation.id(),
                    notes: Some("advised on tenancy rights".to_string()),
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(ended.status(), ConsultationStatus::Completed);
        assert!(ended.ended_at().is_some());
        assert!(ended.duration_minutes().is_some());
        assert_eq!(ended.notes(), Some("advised on tenancy rights"));
        assert!(fixture.bus.has_event("consultation.ended"));
    }

    #[tokio::test]
    async fn repeated_end_is_noop_success() {
        let fixture = Fixture::new();
        let consultation = fixture.in_progress().await;
        let cmd = EndConsultationCommand {
            consultation_id: *consultation.id(),
            notes: None,
        };

        let first = fixture
            .handler
            .handle(cmd.clone(), CommandMetadata::test_fixture())
            .await
            .unwrap();
        let second = fixture
            .handler
            .handle(cmd, CommandMetadata::test_fixture())
            .await
            .unwrap();

        assert_eq!(first.ended_at(), second.ended_at());
        assert_eq!(first.duration_minutes(), second.duration_minutes());
        assert_eq!(fixture.bus.events_of_type("consultation.ended").len(), 1);
    }

    #[tokio::test]
    async fn end_fails_from_scheduled() {
        let fixture = Fixture::new();
        let consultation = Consultation::schedule(
            ConsultationId::new(),
            UserId::new("citizen-1").unwrap(),
            UserId::new("paralegal-1").unwrap(),
            Timestamp::now(),
        )
        .unwrap();
        fixture.repo.insert(&consultation).await.unwrap();

        let result = fixture
            .handler
            .handle(
                EndConsultationCommand {
                    consultation_id: *consultation.id(),
                    notes: None,
                },
                CommandMetadata::test_fixture(),
            )
            .await;

        assert!(matches!(result, Err(ConsultationError::InvalidState(_))));
        assert_eq!(fixture.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn racing_ends_converge_on_one_completion() {
        let fixture = Fixture::new();
        let consultation = fixture.in_progress().await;
        let handler = Arc::new(EndConsultationHandler::new(
            fixture.repo.clone(),
            fixture.bus.clone(),
        ));

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let handler = Arc::clone(&handler);
            let id = *consultation.id();
            tasks.push(tokio::spawn(async move {
                handler
                    .handle(
                        EndConsultationCommand {
                            consultation_id: id,
                            notes: None,
                        },
                        CommandMetadata::test_fixture(),
                    )
                    .await
            }));
        }

        let mut ended_ats = Vec::new();
        for task in tasks {
            let consultation = task.await.unwrap().unwrap();
            ended_ats.push(*consultation.ended_at().unwrap());
        }

        ended_ats.dedup();
        assert_eq!(ended_ats.len(), 1);
        assert_eq!(fixture.bus.events_of_type("consultation.ended").len(), 1);
    }
}
