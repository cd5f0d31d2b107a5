//! HTTP route handlers.

pub mod cart;
pub mod catalog;
pub mod health;
pub mod metrics;
pub mod orders;

use std::str::FromStr;

use serde::Serialize;

use crate::error::ApiError;

/// Body of a successful mutation with nothing else to report.
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Parses an id from a path segment.
pub(crate) fn parse_id<T: FromStr>(id: &str, what: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what} id: {e}")))
}
