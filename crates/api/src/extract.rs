//! Request extractors.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::RequestContext;

/// The caller's session, read from an `Authorization: Bearer <token>` header.
///
/// Never rejects: a missing or malformed header yields an anonymous context
/// and the workflow decides whether that is acceptable.
#[derive(Debug, Clone)]
pub struct Session(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        Ok(Session(match token {
            Some(token) => RequestContext::with_session(token),
            None => RequestContext::anonymous(),
        }))
    }
}
