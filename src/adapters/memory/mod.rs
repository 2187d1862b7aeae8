//! In-memory adapters for tests and database-less development runs.

mod consultation_repository;

pub use consultation_repository::InMemoryConsultationRepository;
