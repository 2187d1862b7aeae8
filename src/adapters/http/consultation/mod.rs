//! HTTP adapter for consultation lifecycle endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::ConsultationHandlers;
pub use routes::consultation_routes;
