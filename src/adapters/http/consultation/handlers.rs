//! HTTP handlers for consultation endpoints.
//!
//! Thin glue: parse the path and body, build the command, run the
//! application handler, map the result. Lifecycle errors surface
//! synchronously as 4xx responses and are never retried here - the
//! handlers' idempotence is what makes client retries safe.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::handlers::consultation::{
    AttachRecordingCommand, AttachRecordingHandler, CancelConsultationCommand,
    CancelConsultationHandler, EndConsultationCommand, EndConsultationHandler,
    GetConsultationHandler, GetConsultationQuery, ScheduleConsultationCommand,
    ScheduleConsultationHandler, SetConsentCommand, SetConsentHandler, StartConsultationCommand,
    StartConsultationHandler, SubmitFeedbackCommand, SubmitFeedbackHandler,
};
use crate::domain::consultation::ConsultationError;
use crate::domain::foundation::{
    CommandMetadata, ConsultationId, FeedbackRating, Timestamp, UserId,
};

use super::super::error::{consultation_error_response, ErrorResponse};
use super::super::middleware::RequireIdentity;
use super::dto::{
    AttachRecordingRequest, ConsultationResponse, EndConsultationRequest,
    ScheduleConsultationRequest, SetConsentRequest, SubmitFeedbackRequest,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ConsultationHandlers {
    pub schedule_handler: Arc<ScheduleConsultationHandler>,
    pub get_handler: Arc<GetConsultationHandler>,
    pub start_handler: Arc<StartConsultationHandler>,
    pub end_handler: Arc<EndConsultationHandler>,
    pub cancel_handler: Arc<CancelConsultationHandler>,
    pub consent_handler: Arc<SetConsentHandler>,
    pub recording_handler: Arc<AttachRecordingHandler>,
    pub feedback_handler: Arc<SubmitFeedbackHandler>,
}

fn metadata(user_id: UserId) -> CommandMetadata {
    CommandMetadata::new(user_id).with_source("api")
}

fn parse_id(raw: &str) -> Result<ConsultationId, Response> {
    raw.parse::<ConsultationId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid consultation ID")),
        )
            .into_response()
    })
}

fn ok(consultation: impl Into<ConsultationResponse>) -> Response {
    (StatusCode::OK, Json(consultation.into())).into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/consultations - Schedule a consultation
pub async fn schedule_consultation(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Json(req): Json<ScheduleConsultationRequest>,
) -> Response {
    let (citizen_id, paralegal_id) =
        match (UserId::new(req.citizen_id), UserId::new(req.paralegal_id)) {
            (Ok(citizen), Ok(paralegal)) => (citizen, paralegal),
            _ => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse::bad_request("Party ids cannot be empty")),
                )
                    .into_response()
            }
        };

    let cmd = ScheduleConsultationCommand {
        citizen_id,
        paralegal_id,
        scheduled_at: Timestamp::from_datetime(req.scheduled_at),
    };

    match handlers.schedule_handler.handle(cmd, metadata(user)).await {
        Ok(consultation) => {
            (StatusCode::CREATED, Json(ConsultationResponse::from(consultation)))
                .into_response()
        }
        Err(e) => consultation_error_response(e),
    }
}

/// GET /api/consultations/:id - Fetch a consultation
pub async fn get_consultation(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(_user): RequireIdentity,
    Path(id): Path<String>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .get_handler
        .handle(GetConsultationQuery { consultation_id })
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}

/// POST /api/consultations/:id/start - Move to in_progress
pub async fn start_consultation(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Path(id): Path<String>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .start_handler
        .handle(StartConsultationCommand { consultation_id }, metadata(user))
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}

/// POST /api/consultations/:id/end - Move to completed
pub async fn end_consultation(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Path(id): Path<String>,
    body: Option<Json<EndConsultationRequest>>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let notes = body.and_then(|Json(req)| req.notes);

    match handlers
        .end_handler
        .handle(
            EndConsultationCommand {
                consultation_id,
                notes,
            },
            metadata(user),
        )
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}

/// POST /api/consultations/:id/cancel - Cancel before completion
pub async fn cancel_consultation(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Path(id): Path<String>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .cancel_handler
        .handle(CancelConsultationCommand { consultation_id }, metadata(user))
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}

/// PUT /api/consultations/:id/consent - Set one party's consent flag
pub async fn set_consent(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Path(id): Path<String>,
    Json(req): Json<SetConsentRequest>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .consent_handler
        .handle(
            SetConsentCommand {
                consultation_id,
                party: req.party,
                value: req.value,
            },
            metadata(user),
        )
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}

/// PUT /api/consultations/:id/recording - Attach the recording reference
pub async fn attach_recording(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Path(id): Path<String>,
    Json(req): Json<AttachRecordingRequest>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .recording_handler
        .handle(
            AttachRecordingCommand {
                consultation_id,
                artifact_ref: req.artifact_ref,
            },
            metadata(user),
        )
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}

/// POST /api/consultations/:id/feedback - Citizen feedback
pub async fn submit_feedback(
    State(handlers): State<ConsultationHandlers>,
    RequireIdentity(user): RequireIdentity,
    Path(id): Path<String>,
    Json(req): Json<SubmitFeedbackRequest>,
) -> Response {
    let consultation_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let rating = match FeedbackRating::new(req.rating) {
        Ok(rating) => rating,
        Err(e) => {
            return consultation_error_response(ConsultationError::validation(
                "rating",
                e.to_string(),
            ))
        }
    };

    match handlers
        .feedback_handler
        .handle(
            SubmitFeedbackCommand {
                consultation_id,
                rating,
                comment: req.comment,
            },
            metadata(user),
        )
        .await
    {
        Ok(consultation) => ok(consultation),
        Err(e) => consultation_error_response(e),
    }
}
