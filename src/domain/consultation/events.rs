//! Consultation domain events.
//!
//! Events published when consultation lifecycle changes occur:
//! - `ConsultationScheduled` - New consultation created
//! - `ConsultationStarted` - Moved to in_progress
//! - `ConsultationEnded` - Completed, duration derived
//! - `ConsultationCancelled` - Cancelled before completion
//! - `ConsentUpdated` - A party toggled recording consent
//! - `RecordingAttached` - Recording artifact reference stored
//! - `FeedbackSubmitted` - Citizen left a rating

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, ConsultationId, EventId, FeedbackRating, Party, RoomId, Timestamp, UserId,
};

// ════════════════════════════════════════════════════════════════════════════
// ConsultationScheduled
// ════════════════════════════════════════════════════════════════════════════

/// Published when a new consultation is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationScheduled {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub room_id: RoomId,
    pub citizen_id: UserId,
    pub paralegal_id: UserId,
    pub scheduled_at: Timestamp,
}

domain_event!(
    ConsultationScheduled,
    event_type = "consultation.scheduled",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = scheduled_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ConsultationStarted
// ════════════════════════════════════════════════════════════════════════════

/// Published on the scheduled -> in_progress edge only.
///
/// The idempotent repeat of `start` does not publish a second event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationStarted {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub room_id: RoomId,
    pub started_at: Timestamp,
}

domain_event!(
    ConsultationStarted,
    event_type = "consultation.started",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = started_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ConsultationEnded
// ════════════════════════════════════════════════════════════════════════════

/// Published on the in_progress -> completed edge only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationEnded {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub duration_minutes: Option<u32>,
    pub ended_at: Timestamp,
}

domain_event!(
    ConsultationEnded,
    event_type = "consultation.ended",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = ended_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ConsultationCancelled
// ════════════════════════════════════════════════════════════════════════════

/// Published when a scheduled or in-progress consultation is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationCancelled {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub cancelled_at: Timestamp,
}

domain_event!(
    ConsultationCancelled,
    event_type = "consultation.cancelled",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = cancelled_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ConsentUpdated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a party toggles their recording-consent flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentUpdated {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub party: Party,
    pub value: bool,
    pub both_granted: bool,
    pub updated_at: Timestamp,
}

domain_event!(
    ConsentUpdated,
    event_type = "consultation.consent_updated",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = updated_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// RecordingAttached
// ════════════════════════════════════════════════════════════════════════════

/// Published when a recording artifact reference is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingAttached {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub artifact_ref: String,
    pub attached_at: Timestamp,
}

domain_event!(
    RecordingAttached,
    event_type = "consultation.recording_attached",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = attached_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// FeedbackSubmitted
// ════════════════════════════════════════════════════════════════════════════

/// Published when the citizen submits feedback on a completed consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSubmitted {
    pub event_id: EventId,
    pub consultation_id: ConsultationId,
    pub rating: FeedbackRating,
    pub submitted_at: Timestamp,
}

domain_event!(
    FeedbackSubmitted,
    event_type = "consultation.feedback_submitted",
    aggregate_id = consultation_id,
    aggregate_type = "Consultation",
    occurred_at = submitted_at,
    event_id = event_id
);
