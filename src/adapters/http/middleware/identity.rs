//! Caller identity extractor.
//!
//! Token issuance and verification are owned by the upstream gateway,
//! which terminates authentication and forwards the resolved user in
//! the `x-user-id` header. This extractor only insists the header is
//! present and well formed; requests that bypass the gateway get a 401.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};

use crate::domain::foundation::UserId;

use super::super::error::ErrorResponse;

/// Header carrying the gateway-resolved user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor rejecting requests without a resolved caller identity.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub UserId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| UserId::new(value).ok())
            .map(RequireIdentity)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::unauthorized("Missing caller identity")),
                )
            })
    }
}
