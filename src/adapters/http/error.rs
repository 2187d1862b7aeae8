//! HTTP error envelope and domain-error mapping.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use crate::domain::consultation::ConsultationError;

/// JSON error body returned by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }
}

/// Map a consultation error onto the REST surface.
///
/// Lifecycle rejections are client-resolvable and come back as 4xx;
/// they are never retried automatically by this service.
pub fn consultation_error_response(err: ConsultationError) -> Response {
    let status = match &err {
        ConsultationError::NotFound(_) => StatusCode::NOT_FOUND,
        ConsultationError::InvalidState(_) => StatusCode::CONFLICT,
        ConsultationError::ConsentRequired => StatusCode::CONFLICT,
        ConsultationError::Forbidden => StatusCode::FORBIDDEN,
        ConsultationError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ConsultationError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "Consultation request failed");
    }

    let body = ErrorResponse::new(err.code().to_string(), err.message());
    (status, Json(body)).into_response()
}
