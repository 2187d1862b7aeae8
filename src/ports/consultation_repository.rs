//! Consultation repository port (write side).
//!
//! Defines the contract for persisting and retrieving Consultation
//! aggregates. The consultation store itself is owned by the surrounding
//! case-management system; this core only reads records and writes
//! lifecycle fields.
//!
//! # Concurrency contract
//!
//! Both participants may call `start` (or `end`) within the same
//! instant. A plain read-modify-write would let the second writer
//! clobber the first, double-setting `started_at`. `update_if_status`
//! is therefore a conditional write: it only persists when the stored
//! status still equals the status the caller read. A `false` return
//! means the caller lost the race and must re-read before deciding
//! whether the outcome it wanted already happened (idempotent success)
//! or is now illegal.

use async_trait::async_trait;

use crate::domain::consultation::Consultation;
use crate::domain::foundation::{ConsultationId, ConsultationStatus, DomainError, Party};

/// Repository port for Consultation aggregate persistence.
#[async_trait]
pub trait ConsultationRepository: Send + Sync {
    /// Save a newly scheduled consultation.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, consultation: &Consultation) -> Result<(), DomainError>;

    /// Find a consultation by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &ConsultationId)
        -> Result<Option<Consultation>, DomainError>;

    /// Conditionally update a consultation.
    ///
    /// The write succeeds only if the stored status still equals
    /// `expected` (compare-and-swap keyed on status). Returns `true`
    /// when the row was written, `false` when a concurrent writer got
    /// there first.
    ///
    /// # Errors
    ///
    /// - `ConsultationNotFound` if the record does not exist
    /// - `DatabaseError` on persistence failure
    async fn update_if_status(
        &self,
        consultation: &Consultation,
        expected: ConsultationStatus,
    ) -> Result<bool, DomainError>;

    /// Set exactly one party's consent flag.
    ///
    /// Targeted single-field write: two parties toggling their own flags
    /// concurrently must not overwrite each other, so this is not a
    /// whole-record update. Returns the updated record.
    ///
    /// # Errors
    ///
    /// - `ConsultationNotFound` if the record does not exist
    /// - `InvalidState` once the consultation is in a terminal status
    /// - `DatabaseError` on persistence failure
    async fn set_consent(
        &self,
        id: &ConsultationId,
        party: Party,
        value: bool,
    ) -> Result<Consultation, DomainError>;

    /// Attach (or overwrite) the recording artifact reference.
    ///
    /// The consent gate is evaluated against the stored flags in the
    /// same write ("both flags true at call time"), so a concurrent
    /// consent withdrawal cannot be clobbered by this update. Returns
    /// the updated record.
    ///
    /// # Errors
    ///
    /// - `ConsultationNotFound` if the record does not exist
    /// - `ConsentRequired` unless both stored flags are true
    /// - `DatabaseError` on persistence failure
    async fn attach_recording(
        &self,
        id: &ConsultationId,
        artifact_ref: &str,
    ) -> Result<Consultation, DomainError>;

    /// Delete a consultation (primarily for testing).
    ///
    /// # Errors
    ///
    /// - `ConsultationNotFound` if the record does not exist
    /// - `DatabaseError` on persistence failure
    async fn delete(&self, id: &ConsultationId) -> Result<(), DomainError>;
}
