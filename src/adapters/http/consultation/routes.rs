//! HTTP routes for consultation endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    attach_recording, cancel_consultation, end_consultation, get_consultation,
    schedule_consultation, set_consent, start_consultation, submit_feedback,
    ConsultationHandlers,
};

/// Creates the consultation router with all endpoints.
pub fn consultation_routes(handlers: ConsultationHandlers) -> Router {
    Router::new()
        .route("/", post(schedule_consultation))
        .route("/:id", get(get_consultation))
        .route("/:id/start", post(start_consultation))
        .route("/:id/end", post(end_consultation))
        .route("/:id/cancel", post(cancel_consultation))
        .route("/:id/consent", put(set_consent))
        .route("/:id/recording", put(attach_recording))
        .route("/:id/feedback", post(submit_feedback))
        .with_state(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryConsultationRepository, InProcessEventBus};
    use crate::application::handlers::consultation::*;
    use std::sync::Arc;

    #[test]
    fn consultation_routes_compile() {
        let repo = Arc::new(InMemoryConsultationRepository::new());
        let bus = Arc::new(InProcessEventBus::new());
        let handlers = ConsultationHandlers {
            schedule_handler: Arc::new(ScheduleConsultationHandler::new(
                repo.clone(),
                bus.clone(),
            )),
            get_handler: Arc::new(GetConsultationHandler::new(repo.clone())),
            start_handler: Arc::new(StartConsultationHandler::new(repo.clone(), bus.clone())),
            end_handler: Arc::new(EndConsultationHandler::new(repo.clone(), bus.clone())),
            cancel_handler: Arc::new(CancelConsultationHandler::new(repo.clone(), bus.clone())),
            consent_handler: Arc::new(SetConsentHandler::new(repo.clone(), bus.clone())),
            recording_handler: Arc::new(AttachRecordingHandler::new(repo.clone(), bus.clone())),
            feedback_handler: Arc::new(SubmitFeedbackHandler::new(repo, bus)),
        };
        let _router = consultation_routes(handlers);
    }
}
