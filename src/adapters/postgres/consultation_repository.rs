//! PostgreSQL implementation of ConsultationRepository.
//!
//! Persists Consultation aggregates to the `consultations` table owned
//! by the surrounding case-management schema.
//!
//! Status transitions use a conditional update (`WHERE status =
//! $expected`), so the check-and-set is a single statement and two
//! participants starting the same consultation in the same instant
//! cannot both take the transition. Consent flags and the recording
//! reference are written as targeted single-column updates with their
//! gate folded into the WHERE clause for the same reason.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::consultation::{ConsentFlags, Consultation, Feedback};
use crate::domain::foundation::{
    ConsultationId, ConsultationStatus, DomainError, ErrorCode, FeedbackRating, Party, RoomId,
    Timestamp, UserId,
};
use crate::ports::ConsultationRepository;

/// PostgreSQL implementation of ConsultationRepository.
#[derive(Clone)]
pub struct PostgresConsultationRepository {
    pool: PgPool,
}

impl PostgresConsultationRepository {
    /// Creates a new PostgresConsultationRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &ConsultationId) -> Result<Option<Consultation>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, room_id, citizen_id, paralegal_id, status, scheduled_at,
                   started_at, ended_at, duration_minutes, notes,
                   consent_citizen, consent_paralegal, recording_ref,
                   feedback_rating, feedback_comment, feedback_submitted_at,
                   created_at, updated_at
            FROM consultations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch consultation"))?;

        row.map(row_to_consultation).transpose()
    }

    async fn fetch_required(&self, id: &ConsultationId) -> Result<Consultation, DomainError> {
        self.fetch(id).await?.ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl ConsultationRepository for PostgresConsultationRepository {
    async fn insert(&self, consultation: &Consultation) -> Result<(), DomainError> {
        let feedback = consultation.feedback();
        sqlx::query(
            r#"
            INSERT INTO consultations (
                id, room_id, citizen_id, paralegal_id, status, scheduled_at,
                started_at, ended_at, duration_minutes, notes,
                consent_citizen, consent_paralegal, recording_ref,
                feedback_rating, feedback_comment, feedback_submitted_at,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                      $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(consultation.id().as_uuid())
        .bind(consultation.room_id().as_uuid())
        .bind(consultation.citizen_id().as_str())
        .bind(consultation.paralegal_id().as_str())
        .bind(consultation.status().as_str())
        .bind(consultation.scheduled_at().as_datetime())
        .bind(consultation.started_at().map(|t| *t.as_datetime()))
        .bind(consultation.ended_at().map(|t| *t.as_datetime()))
        .bind(consultation.duration_minutes().map(|m| m as i32))
        .bind(consultation.notes())
        .bind(consultation.consent().citizen)
        .bind(consultation.consent().paralegal)
        .bind(consultation.recording_ref())
        .bind(feedback.map(|f| f.rating.value() as i16))
        .bind(feedback.and_then(|f| f.comment.as_deref()))
        .bind(feedback.map(|f| *f.submitted_at.as_datetime()))
        .bind(consultation.created_at().as_datetime())
        .bind(consultation.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert consultation"))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ConsultationId,
    ) -> Result<Option<Consultation>, DomainError> {
        self.fetch(id).await
    }

    async fn update_if_status(
        &self,
        consultation: &Consultation,
        expected: ConsultationStatus,
    ) -> Result<bool, DomainError> {
        let feedback = consultation.feedback();
        let result = sqlx::query(
            r#"
            UPDATE consultations SET
                status = $2,
                started_at = $3,
                ended_at = $4,
                duration_minutes = $5,
                notes = $6,
                feedback_rating = $7,
                feedback_comment = $8,
                feedback_submitted_at = $9,
                updated_at = $10
            WHERE id = $1 AND status = $11
            "#,
        )
        .bind(consultation.id().as_uuid())
        .bind(consultation.status().as_str())
        .bind(consultation.started_at().map(|t| *t.as_datetime()))
        .bind(consultation.ended_at().map(|t| *t.as_datetime()))
        .bind(consultation.duration_minutes().map(|m| m as i32))
        .bind(consultation.notes())
        .bind(feedback.map(|f| f.rating.value() as i16))
        .bind(feedback.and_then(|f| f.comment.as_deref()))
        .bind(feedback.map(|f| *f.submitted_at.as_datetime()))
        .bind(consultation.updated_at().as_datetime())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update consultation"))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish "lost the race" from "no such row".
        if self.fetch(consultation.id()).await?.is_some() {
            Ok(false)
        } else {
            Err(not_found(consultation.id()))
        }
    }

    async fn set_consent(
        &self,
        id: &ConsultationId,
        party: Party,
        value: bool,
    ) -> Result<Consultation, DomainError> {
        let query = match party {
            Party::Citizen => {
                r#"
                UPDATE consultations
                SET consent_citizen = $2, updated_at = $3
                WHERE id = $1 AND status IN ('scheduled', 'in_progress')
                "#
            }
            Party::Paralegal => {
                r#"
                UPDATE consultations
                SET consent_paralegal = $2, updated_at = $3
                WHERE id = $1 AND status IN ('scheduled', 'in_progress')
                "#
            }
        };

        let result = sqlx::query(query)
            .bind(id.as_uuid())
            .bind(value)
            .bind(Timestamp::now().as_datetime())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update consent"))?;

        if result.rows_affected() == 0 {
            let current = self.fetch_required(id).await?;
            return Err(DomainError::new(
                ErrorCode::InvalidState,
                format!(
                    "Cannot set_consent a consultation with status '{}'",
                    current.status()
                ),
            )
            .with_detail("status", current.status().as_str()));
        }

        self.fetch_required(id).await
    }

    async fn attach_recording(
        &self,
        id: &ConsultationId,
        artifact_ref: &str,
    ) -> Result<Consultation, DomainError> {
        if artifact_ref.trim().is_empty() {
            return Err(DomainError::validation(
                "artifact_ref",
                "Recording reference cannot be empty",
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE consultations
            SET recording_ref = $2, updated_at = $3
            WHERE id = $1 AND consent_citizen AND consent_paralegal
            "#,
        )
        .bind(id.as_uuid())
        .bind(artifact_ref)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to attach recording"))?;

        if result.rows_affected() == 0 {
            // Row exists but the stored flags gated the write.
            self.fetch_required(id).await?;
            return Err(DomainError::new(
                ErrorCode::ConsentRequired,
                "Recording requires consent from both parties",
            ));
        }

        self.fetch_required(id).await
    }

    async fn delete(&self, id: &ConsultationId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM consultations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete consultation"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn not_found(id: &ConsultationId) -> DomainError {
    DomainError::new(
        ErrorCode::ConsultationNotFound,
        format!("Consultation not found: {}", id),
    )
    .with_detail("consultation_id", id.to_string())
}

fn row_to_consultation(row: sqlx::postgres::PgRow) -> Result<Consultation, DomainError> {
    fn column<'r, T>(row: &'r sqlx::postgres::PgRow, name: &str) -> Result<T, DomainError>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get(name).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to get {}: {}", name, e),
            )
        })
    }

    let status_str: String = column(&row, "status")?;
    let status = ConsultationStatus::parse(&status_str).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid consultation status: {}", status_str),
        )
    })?;

    let citizen_id: String = column(&row, "citizen_id")?;
    let paralegal_id: String = column(&row, "paralegal_id")?;

    let feedback_rating: Option<i16> = column(&row, "feedback_rating")?;
    let feedback = match feedback_rating {
        Some(rating) => {
            let rating = FeedbackRating::new(rating as u8).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid rating: {}", e))
            })?;
            let submitted_at: chrono::DateTime<chrono::Utc> =
                column(&row, "feedback_submitted_at")?;
            Some(Feedback {
                rating,
                comment: column(&row, "feedback_comment")?,
                submitted_at: Timestamp::from_datetime(submitted_at),
            })
        }
        None => None,
    };

    let started_at: Option<chrono::DateTime<chrono::Utc>> = column(&row, "started_at")?;
    let ended_at: Option<chrono::DateTime<chrono::Utc>> = column(&row, "ended_at")?;
    let duration_minutes: Option<i32> = column(&row, "duration_minutes")?;
    let scheduled_at: chrono::DateTime<chrono::Utc> = column(&row, "scheduled_at")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(&row, "created_at")?;
    let updated_at: chrono::DateTime<chrono::Utc> = column(&row, "updated_at")?;

    Ok(Consultation::reconstitute(
        ConsultationId::from_uuid(column(&row, "id")?),
        RoomId::from_uuid(column(&row, "room_id")?),
        UserId::new(citizen_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid citizen_id: {}", e)))?,
        UserId::new(paralegal_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid paralegal_id: {}", e)))?,
        status,
        Timestamp::from_datetime(scheduled_at),
        started_at.map(Timestamp::from_datetime),
        ended_at.map(Timestamp::from_datetime),
        duration_minutes.map(|m| m as u32),
        column(&row, "notes")?,
        ConsentFlags {
            citizen: column(&row, "consent_citizen")?,
            paralegal: column(&row, "consent_paralegal")?,
        },
        column(&row, "recording_ref")?,
        feedback,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}
