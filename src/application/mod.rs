//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between
//! ports. Following CQRS, command handlers (write) are kept apart from
//! query handlers (read).

pub mod handlers;

pub use handlers::consultation::{
    AttachRecordingCommand, AttachRecordingHandler, CancelConsultationCommand,
    CancelConsultationHandler, EndConsultationCommand, EndConsultationHandler,
    GetConsultationHandler, GetConsultationQuery, ScheduleConsultationCommand,
    ScheduleConsultationHandler, SetConsentCommand, SetConsentHandler, StartConsultationCommand,
    StartConsultationHandler, SubmitFeedbackCommand, SubmitFeedbackHandler,
};
