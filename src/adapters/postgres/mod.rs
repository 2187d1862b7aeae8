//! PostgreSQL adapters - Database implementations for repository ports.

mod consultation_repository;

pub use consultation_repository::PostgresConsultationRepository;
