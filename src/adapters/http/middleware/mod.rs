//! HTTP middleware for axum.
//!
//! Cross-cutting request concerns:
//!
//! - `identity` - Caller identity extractor (auth itself lives in the
//!   upstream gateway)

pub mod identity;

pub use identity::{RequireIdentity, USER_ID_HEADER};
