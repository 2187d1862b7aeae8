//! AttachRecordingHandler - stores the recording artifact reference.
//!
//! The consent gate is enforced against the stored flags in the same
//! write, so "both flags true at call time" holds even against a
//! concurrent withdrawal.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationError, RecordingAttached};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, EventEnvelope, EventId, Timestamp,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to attach a recording artifact reference.
#[derive(Debug, Clone)]
pub struct AttachRecordingCommand {
    pub consultation_id: ConsultationId,
    pub artifact_ref: String,
}

/// Handler for attaching recordings.
pub struct AttachRecordingHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl AttachRecordingHandler {
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
        cmd: AttachRecordingCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let updated = self
            .repository
            .attach_recording(&cmd.consultation_id, &cmd.artifact_ref)
            .await?;

        let event = RecordingAttached {
            event_id: EventId::new(),
            consultation_id: *updated.id(),
            artifact_ref: cmd.artifact_ref,
            attached_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::info!(consultation_id = %updated.id(), "Recording reference attached");

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryConsultationRepository, InProcessEventBus};
    use crate::domain::foundation::{Party, UserId};

    struct Fixture {
        handler: AttachRecordingHandler,
        repo: Arc<InMemoryConsultationRepository>,
        bus: Arc<InProcessEventBus>,
    }

    impl Fixture {
        fn new() -> Self {
            let repo = Arc::new(InMemoryConsultationRepository::new());
            let bus = Arc::new(InProcessEventBus::new());
            Self {
                handler: AttachRecordingHandler::new(repo.clone(), bus.clone()),
                repo,
                bus,
            }
        }

        async fn with_consent(&self, citizen: bool, paralegal: bool) -> Consultation {
            let consultation = Consultation::schedule(
                ConsultationId::new(),
                UserId::new("citizen-1").unwrap(),
                UserId::new("paralegal-1").unwrap(),
                Timestamp::now(),
            )
            .unwrap();
            self.repo.insert(&consultation).await.unwrap();
            if citizen {
                self.repo
                    .set_consent(consultation.id(), Party::Citizen, true)
                    .await
                    .unwrap();
            }
            if paralegal {
                self.repo
                    .set_consent(consultation.id(), Party::Paralegal, true)
                    .await
                    .unwrap();
            }
            consultation
        }
    }

    #[tokio::test]
    async fn attach_succeeds_with_both_consents() {
        let fixture = Fixture::new();
        let consultation = fixture.with_consent(true, true).await;

        let updated = fixture
            .handler
            .handle(
                AttachRecordingCommand {
                    consultation_id: *consultation.id(),
                    artifact_ref: "s3://recordings/abc".to_string(),
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(updated.recording_ref(), Some("s3://recordings/abc"));
        assert!(fixture.bus.has_event("consultation.recording_attached"));
    }

    #[tokio::test]
    async fn attach_fails_with_partial_consent() {
        let fixture = Fixture::new();
        let consultation = fixture.with_consent(true, false).await;

        let result = fixture
            .handler
            .handle(
                AttachRecordingCommand {
                    consultation_id: *consultation.id(),
                    artifact_ref: "s3://recordings/abc".to_string(),
                },
                CommandMetadata::test_fixture(),
            )
            .await;

        assert!(matches!(result, Err(ConsultationError::ConsentRequired)));
        assert_eq!(fixture.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn attach_overwrites_idempotently() {
        let fixture = Fixture::new();
        let consultation = fixture.with_consent(true, true).await;

        for artifact_ref in ["ref-1", "ref-2"] {
            fixture
                .handler
                .handle(
                    AttachRecordingCommand {
                        consultation_id: *consultation.id(),
                        artifact_ref: artifact_ref.to_string(),
                    },
                    CommandMetadata::test_fixture(),
                )
                .await
                .unwrap();
        }

        let stored = fixture
            .repo
            .find_by_id(consultation.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.recording_ref(), Some("ref-2"));
    }

    #[tokio::test]
    async fn attach_fails_on_unknown_consultation() {
        let fixture = Fixture::new();
        let result = fixture
            .handler
            .handle(
                AttachRecordingCommand {
                    consultation_id: ConsultationId::new(),
                    artifact_ref: "ref".to_string(),
                },
                CommandMetadata::test_fixture(),
            )
            .await;
        assert!(matches!(result, Err(ConsultationError::NotFound(_))));
    }
}
