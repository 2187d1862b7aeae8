//! GetConsultationHandler - read side for a single consultation.

use std::sync::Arc;

use crate::domain::consultation::{Consultation, ConsultationError};
use crate::domain::foundation::ConsultationId;
use crate::ports::ConsultationRepository;

/// Query for one consultation by id.
#[derive(Debug, Clone)]
pub struct GetConsultationQuery {
    pub consultation_id: ConsultationId,
}

/// Handler for reading consultations.
pub struct GetConsultationHandler {
    repository: Arc<dyn ConsultationRepository>,
}

impl GetConsultationHandler {
    pub fn new(repository: Arc<dyn ConsultationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: GetConsultationQuery,
    ) -> Result<Consultation, ConsultationError> {
        self.repository
            .find_by_id(&query.consultation_id)
            .await?
            .ok_or_else(|| ConsultationError::not_found(query.consultation_id))
    }
}
