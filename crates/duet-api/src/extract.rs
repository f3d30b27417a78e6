//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use duet_core::error::DomainError;
use uuid::Uuid;

use crate::error::ApiError;

/// Header set by the authentication gateway in front of the server.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The authenticated caller, taken from the `x-owner-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| DomainError::Validation(format!("missing {OWNER_HEADER} header")))?;
        raw.to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(OwnerId)
            .ok_or_else(|| {
                ApiError(DomainError::Validation(format!(
                    "{OWNER_HEADER} header must be a UUID"
                )))
            })
    }
}
