//! Caller identification.
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user's id in the `x-user-id` header and every lease operation runs on
//! behalf of that id.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;

pub const CALLER_HEADER: &str = "x-user-id";

/// The user on whose behalf a request runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(CALLER_HEADER) else {
            tracing::warn!("Missing {} header", CALLER_HEADER);
            return Err((
                StatusCode::UNAUTHORIZED,
                format!("Missing {} header", CALLER_HEADER),
            ));
        };

        header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(CallerId)
            .ok_or_else(|| {
                tracing::warn!("Invalid {} header", CALLER_HEADER);
                (
                    StatusCode::UNAUTHORIZED,
                    format!("Invalid {} header", CALLER_HEADER),
                )
            })
    }
}
