//! Caller identity extraction
//!
//! The identity provider in front of this service verifies the session and
//! forwards the user id in a header. No header means an anonymous caller.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use reel_reviews::Actor;
use std::convert::Infallible;

/// Header carrying the verified user id
pub const UID_HEADER: &str = "x-reel-uid";

/// The [`Actor`] behind the current request
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(UID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(Actor::user)
            .unwrap_or(Actor::Anonymous);

        Ok(Caller(actor))
    }
}
