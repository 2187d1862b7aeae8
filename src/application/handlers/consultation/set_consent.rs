//! SetConsentHandler - toggles one party's recording-consent flag.
//!
//! The write targets the single flag in the store, so the two parties
//! toggling their own flags in the same instant cannot overwrite each
//! other.

use std::sync::Arc;

use crate::domain::consultation::{ConsentUpdated, Consultation, ConsultationError};
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, EventEnvelope, EventId, Party, Timestamp,
};
use crate::ports::{ConsultationRepository, EventPublisher};

/// Command to set one party's consent flag.
#[derive(Debug, Clone)]
pub struct SetConsentCommand {
    pub consultation_id: ConsultationId,
    pub party: Party,
    pub value: bool,
}

/// Handler for consent updates.
pub struct SetConsentHandler {
    repository: Arc<dyn ConsultationRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SetConsentHandler {
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
        cmd: SetConsentCommand,
        metadata: CommandMetadata,
    ) -> Result<Consultation, ConsultationError> {
        let updated = self
            .repository
            .set_consent(&cmd.consultation_id, cmd.party, cmd.value)
            .await?;

        let event = ConsentUpdated {
            event_id: EventId::new(),
            consultation_id: *updated.id(),
            party: cmd.party,
            value: cmd.value,
            both_granted: updated.consent().both_granted(),
            updated_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        tracing::debug!(
            consultation_id = %updated.id(),
            party = %cmd.party,
            value = cmd.value,
            "Recording consent updated"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryConsultationRepository, InProcessEventBus};
    use crate::domain::foundation::UserId;

    struct Fixture {
        handler: SetConsentHandler,
        repo: Arc<InMemoryConsultationRepository>,
        bus: Arc<InProcessEventBus>,
    }

    impl Fixture {
        fn new() -> Self {
            let repo = Arc::new(InMemoryConsultationRepository::new());
            let bus = Arc::new(InProcessEventBus::new());
            Self {
                handler: SetConsentHandler::new(repo.clone(), bus.clone()),
                repo,
                bus,
            }
        }

        async fn scheduled(&self) -> Consultation {
            let consultation = Consultation::schedule(
                ConsultationId::new(),
                UserId::new("citizen-1").unwrap(),
                UserId::new("paralegal-1").unwrap(),
                Timestamp::now(),
            )
            .unwrap();
            self.repo.insert(&consultation).await.unwrap();
            consultation
        }
    }

    #[tokio::test]
    async fn sets_one_flag_and_reports_both_granted() {
        let fixture = Fixture::new();
        let consultation = fixture.scheduled().await;

        let updated = fixture
            .handler
            .handle(
                SetConsentCommand {
                    consultation_id: *consultation.id(),
                    party: Party::Citizen,
                    value: true,
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();
        assert!(updated.consent().get(Party::Citizen));
        assert!(!updated.consent().both_granted());

        let updated = fixture
            .handler
            .handle(
                SetConsentCommand {
                    consultation_id: *consultation.id(),
                    party: Party::Paralegal,
                    value: true,
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();
        assert!(updated.consent().both_granted());

        let events = fixture.bus.events_of_type("consultation.consent_updated");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload["both_granted"], false);
        assert_eq!(events[1].payload["both_granted"], true);
    }

    #[tokio::test]
    async fn concurrent_toggles_do_not_lose_either_flag() {
        let fixture = Fixture::new();
        let consultation = fixture.scheduled().await;
        let handler = Arc::new(SetConsentHandler::new(
            fixture.repo.clone(),
            fixture.bus.clone(),
        ));

        let citizen = {
            let handler = Arc::clone(&handler);
            let id = *consultation.id();
            tokio::spawn(async move {
                handler
                    .handle(
                        SetConsentCommand {
                            consultation_id: id,
                            party: Party::Citizen,
                            value: true,
                        },
                        CommandMetadata::test_fixture(),
                    )
                    .await
            })
        };
        let paralegal = {
            let handler = Arc::clone(&handler);
            let id = *consultation.id();
            tokio::spawn(async move {
                handler
                    .handle(
                        SetConsentCommand {
                            consultation_id: id,
                            party: Party::Paralegal,
                            value: true,
                        },
                        CommandMetadata::test_fixture(),
                    )
                    .await
            })
        };

        citizen.await.unwrap().unwrap();
        paralegal.await.unwrap().unwrap();

        let stored = fixture
            .repo
            .find_by_id(consultation.id())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.consent().both_granted());
    }

    #[tokio::test]
    async fn consent_on_unknown_consultation_fails() {
        let fixture = Fixture::new();
        let result = fixture
            .handler
            .handle(
                SetConsentCommand {
                    consultation_id: ConsultationId::new(),
                    party: Party::Citizen,
                    value: true,
                },
                CommandMetadata::test_fixture(),
            )
            .await;
        assert!(matches!(result, Err(ConsultationError::NotFound(_))));
    }
}
