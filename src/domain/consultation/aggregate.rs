//! Consultation aggregate entity.
//!
//! A consultation is a scheduled video meeting between one citizen and
//! one paralegal. The aggregate owns the lifecycle state machine, the
//! recording-consent gate, and post-consultation feedback.
//!
//! # Idempotence
//!
//! Both participants independently call `start` as they join and `end`
//! as they leave, so the second caller of either must succeed without
//! changing state. Mutations therefore return `Ok(true)` when they
//! actually transitioned and `Ok(false)` when the aggregate was already
//! where the caller wanted it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConsultationId, ConsultationStatus, DomainError, ErrorCode, FeedbackRating, Party, RoomId,
    StateMachine, Timestamp, UserId,
};

/// Per-party recording consent flags.
///
/// Recording may only be attached while both flags are true. Flipping a
/// flag back to false never clears an already-stored recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFlags {
    pub citizen: bool,
    pub paralegal: bool,
}

impl ConsentFlags {
    /// True when both parties have consented.
    pub fn both_granted(&self) -> bool {
        self.citizen && self.paralegal
    }

    /// Returns the flag for one party.
    pub fn get(&self, party: Party) -> bool {
        match party {
            Party::Citizen => self.citizen,
            Party::Paralegal => self.paralegal,
        }
    }

    /// Sets the flag for one party.
    pub fn set(&mut self, party: Party, value: bool) {
        match party {
            Party::Citizen => self.citizen = value,
            Party::Paralegal => self.paralegal = value,
        }
    }
}

/// Citizen feedback left after a completed consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: FeedbackRating,
    pub comment: Option<String>,
    pub submitted_at: Timestamp,
}

/// Consultation aggregate - the unit of scheduling and lifecycle.
///
/// # Invariants
///
/// - `citizen_id != paralegal_id`
/// - `started_at <= ended_at` whenever both are set
/// - `duration_minutes` is derived at completion and never recomputed
/// - `Completed` and `Cancelled` are absorbing states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    /// Unique identifier for this consultation.
    id: ConsultationId,

    /// Room identifier used for transport grouping of the two peers.
    room_id: RoomId,

    /// The citizen party (foreign reference into the user directory).
    citizen_id: UserId,

    /// The paralegal party.
    paralegal_id: UserId,

    /// Current lifecycle status.
    status: ConsultationStatus,

    /// When the consultation is scheduled to take place.
    scheduled_at: Timestamp,

    /// Set on the scheduled -> in_progress edge.
    started_at: Option<Timestamp>,

    /// Set on the in_progress -> completed edge.
    ended_at: Option<Timestamp>,

    /// Whole minutes between start and end, rounded; derived at completion.
    duration_minutes: Option<u32>,

    /// Free-text notes captured when the consultation ends.
    notes: Option<String>,

    /// Per-party recording consent.
    consent: ConsentFlags,

    /// Pointer to an externally stored recording artifact.
    recording_ref: Option<String>,

    /// Citizen feedback, present only after submission on a completed
    /// consultation.
    feedback: Option<Feedback>,

    /// When the record was created.
    created_at: Timestamp,

    /// When the record was last updated.
    updated_at: Timestamp,
}

impl Consultation {
    /// Schedule a new consultation between two distinct parties.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if citizen and paralegal are the same user
    pub fn schedule(
        id: ConsultationId,
        citizen_id: UserId,
        paralegal_id: UserId,
        scheduled_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if citizen_id == paralegal_id {
            return Err(DomainError::validation(
                "paralegal_id",
                "Citizen and paralegal must be different users",
            ));
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            room_id: RoomId::new(),
            citizen_id,
            paralegal_id,
            status: ConsultationStatus::Scheduled,
            scheduled_at,
            started_at: None,
            ended_at: None,
            duration_minutes: None,
            notes: None,
            consent: ConsentFlags::default(),
            recording_ref: None,
            feedback: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a consultation from persistence (no validation, no events).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ConsultationId,
        room_id: RoomId,
        citizen_id: UserId,
        paralegal_id: UserId,
        status: ConsultationStatus,
        scheduled_at: Timestamp,
        started_at: Option<Timestamp>,
        ended_at: Option<Timestamp>,
        duration_minutes: Option<u32>,
        notes: Option<String>,
        consent: ConsentFlags,
        recording_ref: Option<String>,
        feedback: Option<Feedback>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            citizen_id,
            paralegal_id,
            status,
            scheduled_at,
            started_at,
            ended_at,
            duration_minutes,
            notes,
            consent,
            recording_ref,
            feedback,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ConsultationId {
        &self.id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn citizen_id(&self) -> &UserId {
        &self.citizen_id
    }

    pub fn paralegal_id(&self) -> &UserId {
        &self.paralegal_id
    }

    pub fn status(&self) -> ConsultationStatus {
        self.status
    }

    pub fn scheduled_at(&self) -> &Timestamp {
        &self.scheduled_at
    }

    pub fn started_at(&self) -> Option<&Timestamp> {
        self.started_at.as_ref()
    }

    pub fn ended_at(&self) -> Option<&Timestamp> {
        self.ended_at.as_ref()
    }

    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn consent(&self) -> &ConsentFlags {
        &self.consent
    }

    pub fn recording_ref(&self) -> Option<&str> {
        self.recording_ref.as_deref()
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Adopt the consent flags and recording reference from `stored`.
    ///
    /// Status updates deliberately leave these two fields to targeted
    /// writes; store adapters that persist whole records call this so a
    /// stale copy cannot clobber a concurrent consent toggle or
    /// recording attach.
    pub(crate) fn adopt_consent_and_recording(&mut self, stored: &Consultation) {
        self.consent = stored.consent;
        self.recording_ref = stored.recording_ref.clone();
    }

    /// Which side of the consultation a user is, if any.
    pub fn party_of(&self, user_id: &UserId) -> Option<Party> {
        if user_id == &self.citizen_id {
            Some(Party::Citizen)
        } else if user_id == &self.paralegal_id {
            Some(Party::Paralegal)
        } else {
            None
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Move the consultation to `InProgress`.
    ///
    /// Returns `Ok(true)` on the scheduled -> in_progress edge (sets
    /// `started_at = now`), `Ok(false)` when already in progress (the
    /// second participant joining; `started_at` is left untouched).
    ///
    /// # Errors
    ///
    /// - `InvalidState` from `Completed` or `Cancelled`
    pub fn start(&mut self) -> Result<bool, DomainError> {
        match self.status {
            ConsultationStatus::InProgress => Ok(false),
            ConsultationStatus::Scheduled => {
                self.status = self.status.transition_to(ConsultationStatus::InProgress)?;
                let now = Timestamp::now();
                self.started_at = Some(now);
                self.updated_at = now;
                Ok(true)
            }
            status => Err(invalid_state("start", status)),
        }
    }

    /// Move the consultation to `Completed`.
    ///
    /// Returns `Ok(true)` on the in_progress -> completed edge (sets
    /// `ended_at`, derives `duration_minutes`, stores notes when given),
    /// `Ok(false)` when already completed - clients call end defensively
    /// on every disconnect, so the repeat is a success, not an error,
    /// and leaves `ended_at`/`duration_minutes` unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidState` from `Scheduled` or `Cancelled`
    pub fn end(&mut self, notes: Option<String>) -> Result<bool, DomainError> {
        match self.status {
            ConsultationStatus::Completed => Ok(false),
            ConsultationStatus::InProgress => {
                self.status = self.status.transition_to(ConsultationStatus::Completed)?;
                let now = Timestamp::now();
                self.ended_at = Some(now);
                self.duration_minutes = self
                    .started_at
                    .map(|started| now.minutes_since(&started).max(0) as u32);
                if notes.is_some() {
                    self.notes = notes;
                }
                self.updated_at = now;
                Ok(true)
            }
            status => Err(invalid_state("end", status)),
        }
    }

    /// Move the consultation to `Cancelled`.
    ///
    /// Allowed from `Scheduled` and `InProgress`; `Ok(false)` when
    /// already cancelled.
    ///
    /// # Errors
    ///
    /// - `InvalidState` from `Completed` (a finished consultation cannot
    ///   retroactively be cancelled)
    pub fn cancel(&mut self) -> Result<bool, DomainError> {
        match self.status {
            ConsultationStatus::Cancelled => Ok(false),
            ConsultationStatus::Scheduled | ConsultationStatus::InProgress => {
                self.status = self.status.transition_to(ConsultationStatus::Cancelled)?;
                self.updated_at = Timestamp::now();
                Ok(true)
            }
            status => Err(invalid_state("cancel", status)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consent, recording, feedback
    // ─────────────────────────────────────────────────────────────────────────

    /// Set one party's recording-consent flag.
    ///
    /// No state-machine gating beyond the terminal check; either party
    /// may toggle at any point before the consultation is over.
    ///
    /// # Errors
    ///
    /// - `InvalidState` once the consultation is `Completed`/`Cancelled`
    pub fn set_consent(&mut self, party: Party, value: bool) -> Result<(), DomainError> {
        if self.status.is_terminal_state() {
            return Err(invalid_state("set_consent", self.status));
        }
        self.consent.set(party, value);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Attach (or idempotently overwrite) the recording artifact reference.
    ///
    /// # Errors
    ///
    /// - `ConsentRequired` unless both consent flags are true at call time
    /// - `ValidationFailed` for an empty reference
    pub fn attach_recording(&mut self, artifact_ref: String) -> Result<(), DomainError> {
        if artifact_ref.trim().is_empty() {
            return Err(DomainError::validation(
                "artifact_ref",
                "Recording reference cannot be empty",
            ));
        }
        if !self.consent.both_granted() {
            return Err(DomainError::new(
                ErrorCode::ConsentRequired,
                "Recording requires consent from both parties",
            ));
        }
        self.recording_ref = Some(artifact_ref);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Record citizen feedback on a completed consultation.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless status is `Completed`
    /// - `Forbidden` if the caller is not the citizen party
    pub fn submit_feedback(
        &mut self,
        caller: &UserId,
        rating: FeedbackRating,
        comment: Option<String>,
    ) -> Result<(), DomainError> {
        if self.status != ConsultationStatus::Completed {
            return Err(invalid_state("submit_feedback", self.status));
        }
        if self.party_of(caller) != Some(Party::Citizen) {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Only the citizen party may submit feedback",
            ));
        }

        let now = Timestamp::now();
        self.feedback = Some(Feedback {
            rating,
            comment,
            submitted_at: now,
        });
        self.updated_at = now;
        Ok(())
    }
}

fn invalid_state(operation: &str, status: ConsultationStatus) -> DomainError {
    DomainError::new(
        ErrorCode::InvalidState,
        format!("Cannot {} a consultation with status '{}'", operation, status),
    )
    .with_detail("status", status.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn citizen() -> UserId {
        UserId::new("citizen-1").unwrap()
    }

    fn paralegal() -> UserId {
        UserId::new("paralegal-1").unwrap()
    }

    fn scheduled_consultation() -> Consultation {
        Consultation::schedule(
            ConsultationId::new(),
            citizen(),
            paralegal(),
            Timestamp::now(),
        )
        .unwrap()
    }

    fn in_progress_since(minutes_ago: i64) -> Consultation {
        let mut consultation = scheduled_consultation();
        consultation.start().unwrap();
        let started =
            Timestamp::from_datetime(*Timestamp::now().as_datetime() - Duration::minutes(minutes_ago));
        consultation.started_at = Some(started);
        consultation
    }

    // Scheduling

    #[test]
    fn schedule_creates_scheduled_consultation() {
        let consultation = scheduled_consultation();
        assert_eq!(consultation.status(), ConsultationStatus::Scheduled);
        assert!(consultation.started_at().is_none());
        assert!(consultation.ended_at().is_none());
        assert!(!consultation.consent().both_granted());
    }

    #[test]
    fn schedule_rejects_same_user_on_both_sides() {
        let result = Consultation::schedule(
            ConsultationId::new(),
            citizen(),
            citizen(),
            Timestamp::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn party_of_identifies_both_sides() {
        let consultation = scheduled_consultation();
        assert_eq!(consultation.party_of(&citizen()), Some(Party::Citizen));
        assert_eq!(consultation.party_of(&paralegal()), Some(Party::Paralegal));
        assert_eq!(
            consultation.party_of(&UserId::new("stranger").unwrap()),
            None
        );
    }

    // Start

    #[test]
    fn start_sets_started_at_once() {
        let mut consultation = scheduled_consultation();

        assert!(consultation.start().unwrap());
        let first_started_at = *consultation.started_at().unwrap();
        assert_eq!(consultation.status(), ConsultationStatus::InProgress);

        // Second participant joining: success, same timestamp.
        assert!(!consultation.start().unwrap());
        assert_eq!(*consultation.started_at().unwrap(), first_started_at);
    }

    #[test]
    fn start_fails_from_terminal_states() {
        let mut completed = in_progress_since(1);
        completed.end(None).unwrap();
        let err = completed.start().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let mut cancelled = scheduled_consultation();
        cancelled.cancel().unwrap();
        assert_eq!(
            cancelled.start().unwrap_err().code,
            ErrorCode::InvalidState
        );
    }

    // End

    #[test]
    fn end_computes_duration_and_stores_notes() {
        let mut consultation = in_progress_since(45);

        assert!(consultation.end(Some("resolved".to_string())).unwrap());

        assert_eq!(consultation.status(), ConsultationStatus::Completed);
        assert_eq!(consultation.duration_minutes(), Some(45));
        assert_eq!(consultation.notes(), Some("resolved"));
        assert!(consultation.started_at().unwrap() <= consultation.ended_at().unwrap());
    }

    #[test]
    fn end_is_idempotent_after_completion() {
        let mut consultation = in_progress_since(30);
        consultation.end(None).unwrap();

        let ended_at = *consultation.ended_at().unwrap();
        let duration = consultation.duration_minutes();

        // Defensive repeat call from the other participant's disconnect.
        assert!(!consultation.end(Some("late notes".to_string())).unwrap());
        assert_eq!(*consultation.ended_at().unwrap(), ended_at);
        assert_eq!(consultation.duration_minutes(), duration);
        assert_eq!(consultation.notes(), None);
    }

    #[test]
    fn end_fails_from_scheduled_and_cancelled() {
        let mut scheduled = scheduled_consultation();
        assert_eq!(
            scheduled.end(None).unwrap_err().code,
            ErrorCode::InvalidState
        );

        let mut cancelled = scheduled_consultation();
        cancelled.cancel().unwrap();
        assert_eq!(
            cancelled.end(None).unwrap_err().code,
            ErrorCode::InvalidState
        );
    }

    // Cancel

    #[test]
    fn cancel_allowed_from_scheduled_and_in_progress() {
        let mut scheduled = scheduled_consultation();
        assert!(scheduled.cancel().unwrap());
        assert_eq!(scheduled.status(), ConsultationStatus::Cancelled);

        let mut in_progress = in_progress_since(5);
        assert!(in_progress.cancel().unwrap());
        assert_eq!(in_progress.status(), ConsultationStatus::Cancelled);
    }

    #[test]
    fn cancel_is_idempotent_but_rejected_after_completion() {
        let mut cancelled = scheduled_consultation();
        cancelled.cancel().unwrap();
        assert!(!cancelled.cancel().unwrap());

        let mut completed = in_progress_since(10);
        completed.end(None).unwrap();
        assert_eq!(
            completed.cancel().unwrap_err().code,
            ErrorCode::InvalidState
        );
    }

    // Consent and recording

    #[test]
    fn consent_flags_are_independent() {
        let mut consultation = scheduled_consultation();

        consultation.set_consent(Party::Citizen, true).unwrap();
        assert!(consultation.consent().get(Party::Citizen));
        assert!(!consultation.consent().get(Party::Paralegal));
        assert!(!consultation.consent().both_granted());

        consultation.set_consent(Party::Paralegal, true).unwrap();
        assert!(consultation.consent().both_granted());
    }

    #[test]
    fn consent_rejected_on_terminal_consultation() {
        let mut consultation = scheduled_consultation();
        consultation.cancel().unwrap();
        assert_eq!(
            consultation
                .set_consent(Party::Citizen, true)
                .unwrap_err()
                .code,
            ErrorCode::InvalidState
        );
    }

    #[test]
    fn attach_recording_requires_both_consents() {
        let mut consultation = in_progress_since(1);

        let err = consultation
            .attach_recording("s3://recordings/abc".to_string())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConsentRequired);

        consultation.set_consent(Party::Citizen, true).unwrap();
        assert_eq!(
            consultation
                .attach_recording("s3://recordings/abc".to_string())
                .unwrap_err()
                .code,
            ErrorCode::ConsentRequired
        );

        consultation.set_consent(Party::Paralegal, true).unwrap();
        consultation
            .attach_recording("s3://recordings/abc".to_string())
            .unwrap();
        assert_eq!(consultation.recording_ref(), Some("s3://recordings/abc"));
    }

    #[test]
    fn attach_recording_overwrites_idempotently() {
        let mut consultation = in_progress_since(1);
        consultation.set_consent(Party::Citizen, true).unwrap();
        consultation.set_consent(Party::Paralegal, true).unwrap();

        consultation.attach_recording("ref-1".to_string()).unwrap();
        consultation.attach_recording("ref-2".to_string()).unwrap();
        assert_eq!(consultation.recording_ref(), Some("ref-2"));
    }

    #[test]
    fn consent_withdrawal_keeps_stored_recording() {
        let mut consultation = in_progress_since(1);
        consultation.set_consent(Party::Citizen, true).unwrap();
        consultation.set_consent(Party::Paralegal, true).unwrap();
        consultation.attach_recording("ref-1".to_string()).unwrap();

        consultation.set_consent(Party::Citizen, false).unwrap();

        // The stored reference survives, but a new attach is gated again.
        assert_eq!(consultation.recording_ref(), Some("ref-1"));
        assert_eq!(
            consultation
                .attach_recording("ref-2".to_string())
                .unwrap_err()
                .code,
            ErrorCode::ConsentRequired
        );
    }

    #[test]
    fn attach_recording_rejects_empty_ref() {
        let mut consultation = scheduled_consultation();
        consultation.set_consent(Party::Citizen, true).unwrap();
        consultation.set_consent(Party::Paralegal, true).unwrap();
        assert!(consultation.attach_recording("  ".to_string()).is_err());
    }

    // Feedback

    #[test]
    fn feedback_requires_completed_status() {
        let mut consultation = in_progress_since(1);
        let err = consultation
            .submit_feedback(&citizen(), FeedbackRating::new(5).unwrap(), None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn feedback_accepted_from_citizen_only() {
        let mut consultation = in_progress_since(20);
        consultation.end(None).unwrap();

        consultation
            .submit_feedback(
                &citizen(),
                FeedbackRating::new(5).unwrap(),
                Some("very helpful".to_string()),
            )
            .unwrap();
        assert_eq!(consultation.feedback().unwrap().rating.value(), 5);

        let err = consultation
            .submit_feedback(&paralegal(), FeedbackRating::new(3).unwrap(), None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
