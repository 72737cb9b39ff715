//! Custom Axum extractors.
//!
//! - `RequesterId`: the calling user, from the `X-User-Id` header
//!
//! # Examples
//!
//! ```ignore
//! use genbridge_web::extractors::RequesterId;
//!
//! async fn handler(requester: RequesterId) -> String {
//!     format!("Hello {}", requester.0)
//! }
//! ```

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const REQUESTER_ID_HEADER: &str = "X-User-Id";

/// Id of the user making the request.
///
/// Rejects with `400 Bad Request` when the header is missing, empty or not
/// valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequesterId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(REQUESTER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self(id.to_string()))
            .ok_or_else(|| {
                AppError::bad_request(format!("{REQUESTER_ID_HEADER} header is required"))
            })
    }
}
