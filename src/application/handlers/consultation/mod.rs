//! Consultation command and query handlers.

mod attach_recording;
mod cancel_consultation;
mod end_consultation;
mod get_consultation;
mod schedule_consultation;
mod set_consent;
mod start_consultation;
mod submit_feedback;

pub use attach_recording::{AttachRecordingCommand, AttachRecordingHandler};
pub use cancel_consultation::{CancelConsultationCommand, CancelConsultationHandler};
pub use end_consultation::{EndConsultationCommand, EndConsultationHandler};
pub use get_consultation::{GetConsultationHandler, GetConsultationQuery};
pub use schedule_consultation::{ScheduleConsultationCommand, ScheduleConsultationHandler};
pub use set_consent::{SetConsentCommand, SetConsentHandler};
pub use start_consultation::{StartConsultationCommand, StartConsultationHandler};
pub use submit_feedback::{SubmitFeedbackCommand, SubmitFeedbackHandler};
