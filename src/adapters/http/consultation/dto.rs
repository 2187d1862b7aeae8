//! HTTP DTOs for consultation endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing
//! independent evolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::consultation::Consultation;
use crate::domain::foundation::{ConsultationStatus, Party};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to schedule a new consultation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConsultationRequest {
    pub citizen_id: String,
    pub paralegal_id: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Request to end a consultation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndConsultationRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to set one party's recording consent.
#[derive(Debug, Clone, Deserialize)]
pub struct SetConsentRequest {
    pub party: Party,
    pub value: bool,
}

/// Request to attach a recording artifact reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRecordingRequest {
    pub artifact_ref: String,
}

/// Request to submit citizen feedback.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Recording-consent flags as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentResponse {
    pub citizen: bool,
    pub paralegal: bool,
}

/// Feedback as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: String,
}

/// Full consultation view returned by every lifecycle endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationResponse {
    pub id: String,
    pub room_id: String,
    pub citizen_id: String,
    pub paralegal_id: String,
    pub status: ConsultationStatus,
    pub scheduled_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub consent: ConsentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Consultation> for ConsultationResponse {
    fn from(consultation: Consultation) -> Self {
        Self {
            id: consultation.id().to_string(),
            room_id: consultation.room_id().to_string(),
            citizen_id: consultation.citizen_id().to_string(),
            paralegal_id: consultation.paralegal_id().to_string(),
            status: consultation.status(),
            scheduled_at: consultation.scheduled_at().to_rfc3339(),
            started_at: consultation.started_at().map(|t| t.to_rfc3339()),
            ended_at: consultation.ended_at().map(|t| t.to_rfc3339()),
            duration_minutes: consultation.duration_minutes(),
            notes: consultation.notes().map(str::to_string),
            consent: ConsentResponse {
                citizen: consultation.consent().citizen,
                paralegal: consultation.consent().paralegal,
            },
            recording_ref: consultation.recording_ref().map(str::to_string),
            feedback: consultation.feedback().map(|f| FeedbackResponse {
                rating: f.rating.value(),
                comment: f.comment.clone(),
                submitted_at: f.submitted_at.to_rfc3339(),
            }),
            created_at: consultation.created_at().to_rfc3339(),
            updated_at: consultation.updated_at().to_rfc3339(),
        }
    }
}
