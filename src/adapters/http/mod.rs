//! HTTP adapters - REST API implementations.

pub mod consultation;
pub mod error;
pub mod middleware;

pub use consultation::{consultation_routes, ConsultationHandlers};
pub use error::ErrorResponse;
pub use middleware::RequireIdentity;
