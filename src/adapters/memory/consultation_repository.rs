//! In-memory implementation of ConsultationRepository.
//!
//! Backs unit and integration tests, and development runs without a
//! database. Records live in a `DashMap`, so the conditional-update and
//! targeted-consent writes hold only the one entry's shard lock -
//! operations on different consultations never contend.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::consultation::Consultation;
use crate::domain::foundation::{
    ConsultationId, ConsultationStatus, DomainError, ErrorCode, Party,
};
use crate::ports::ConsultationRepository;

/// In-memory consultation store keyed by consultation id.
#[derive(Default)]
pub struct InMemoryConsultationRepository {
    records: DashMap<ConsultationId, Consultation>,
}

impl InMemoryConsultationRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of stored records (test helper).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn not_found(id: &ConsultationId) -> DomainError {
    DomainError::new(
        ErrorCode::ConsultationNotFound,
        format!("Consultation not found: {}", id),
    )
    .with_detail("consultation_id", id.to_string())
}

#[async_trait]
impl ConsultationRepository for InMemoryConsultationRepository {
    async fn insert(&self, consultation: &Consultation) -> Result<(), DomainError> {
        match self.records.entry(*consultation.id()) {
            Entry::Occupied(_) => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Consultation already exists: {}", consultation.id()),
            )),
            Entry::Vacant(vacant) => {
                vacant.insert(consultation.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(
        &self,
        id: &ConsultationId,
    ) -> Result<Option<Consultation>, DomainError> {
        Ok(self.records.get(id).map(|entry| entry.clone()))
    }

    async fn update_if_status(
        &self,
        consultation: &Consultation,
        expected: ConsultationStatus,
    ) -> Result<bool, DomainError> {
        // get_mut holds the entry's shard lock for the whole
        // check-and-swap, which is what makes this a CAS.
        match self.records.get_mut(consultation.id()) {
            None => Err(not_found(consultation.id())),
            Some(mut entry) => {
                if entry.status() != expected {
                    return Ok(false);
                }
                // Consent and recording are owned by targeted writes;
                // keep the stored values rather than the caller's copy.
                let mut updated = consultation.clone();
                updated.adopt_consent_and_recording(entry.value());
                *entry = updated;
                Ok(true)
            }
        }
    }

    async fn set_consent(
        &self,
        id: &ConsultationId,
        party: Party,
        value: bool,
    ) -> Result<Consultation, DomainError> {
        match self.records.get_mut(id) {
            None => Err(not_found(id)),
            Some(mut entry) => {
                entry.set_consent(party, value)?;
                Ok(entry.clone())
            }
        }
    }

    async fn attach_recording(
        &self,
        id: &ConsultationId,
        artifact_ref: &str,
    ) -> Result<Consultation, DomainError> {
        match self.records.get_mut(id) {
            None => Err(not_found(id)),
            Some(mut entry) => {
                entry.attach_recording(artifact_ref.to_string())?;
                Ok(entry.clone())
            }
        }
    }

    async fn delete(&self, id: &ConsultationId) -> Result<(), DomainError> {
        match self.records.remove(id) {
            Some(_) => Ok(()),
            None => Err(not_found(id)),
        }
    }
}
