//! Consultation-specific error types.

use crate::domain::foundation::{ConsultationId, DomainError, ErrorCode};

/// Consultation-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationError {
    /// Consultation was not found.
    NotFound(ConsultationId),
    /// Lifecycle operation attempted from a status that forbids it.
    InvalidState(String),
    /// Recording attach attempted without both consent flags set.
    ConsentRequired,
    /// Caller is not allowed to perform the operation.
    Forbidden,
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// Infrastructure error.
    Infrastructure(String),
}

impl ConsultationError {
    pub fn not_found(id: ConsultationId) -> Self {
        ConsultationError::NotFound(id)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ConsultationError::InvalidState(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConsultationError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        ConsultationError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConsultationError::NotFound(_) => ErrorCode::ConsultationNotFound,
            ConsultationError::InvalidState(_) => ErrorCode::InvalidState,
            ConsultationError::ConsentRequired => ErrorCode::ConsentRequired,
            ConsultationError::Forbidden => ErrorCode::Forbidden,
            ConsultationError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ConsultationError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ConsultationError::NotFound(id) => format!("Consultation not found: {}", id),
            ConsultationError::InvalidState(msg) => msg.clone(),
            ConsultationError::ConsentRequired => {
                "Recording requires consent from both parties".to_string()
            }
            ConsultationError::Forbidden => "Permission denied".to_string(),
            ConsultationError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ConsultationError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for ConsultationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ConsultationError {}

impl From<DomainError> for ConsultationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            // Adapters tag not-found errors with the id they were asked for.
            ErrorCode::ConsultationNotFound => err
                .details
                .get("consultation_id")
                .and_then(|id| id.parse().ok())
                .map(ConsultationError::NotFound)
                .unwrap_or_else(|| ConsultationError::Infrastructure(err.to_string())),
            ErrorCode::InvalidState => ConsultationError::InvalidState(err.message),
            ErrorCode::ConsentRequired => ConsultationError::ConsentRequired,
            ErrorCode::Forbidden => ConsultationError::Forbidden,
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => ConsultationError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => ConsultationError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            ConsultationError::ConsentRequired.code(),
            ErrorCode::ConsentRequired
        );
        assert_eq!(ConsultationError::Forbidden.code(), ErrorCode::Forbidden);
        assert_eq!(
            ConsultationError::invalid_state("nope").code(),
            ErrorCode::InvalidState
        );
    }

    #[test]
    fn domain_error_maps_to_matching_variant() {
        let err: ConsultationError =
            DomainError::new(ErrorCode::ConsentRequired, "both flags required").into();
        assert_eq!(err, ConsultationError::ConsentRequired);

        let err: ConsultationError =
            DomainError::new(ErrorCode::Forbidden, "not the citizen").into();
        assert_eq!(err, ConsultationError::Forbidden);
    }

    #[test]
    fn validation_error_carries_field_detail() {
        let err: ConsultationError = DomainError::validation("rating", "out of range").into();
        match err {
            ConsultationError::ValidationFailed { field, .. } => assert_eq!(field, "rating"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
