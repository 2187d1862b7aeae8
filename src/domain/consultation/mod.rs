//! Consultation module - the scheduling and lifecycle aggregate.

mod aggregate;
mod errors;
mod events;

pub use aggregate::{ConsentFlags, Consultation, Feedback};
pub use errors::ConsultationError;
pub use events::{
    ConsentUpdated, ConsultationCancelled, ConsultationEnded, ConsultationScheduled,
    ConsultationStarted, FeedbackSubmitted, RecordingAttached,
};
