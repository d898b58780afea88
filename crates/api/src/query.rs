//! Shared query parameter types for API handlers.

use campus_core::error::CoreError;
use campus_core::rsvp::RsvpStatus;
use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the handler via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for the attendee list (`?status=going`).
#[derive(Debug, Deserialize)]
pub struct RsvpListParams {
    pub status: Option<String>,
}

impl RsvpListParams {
    /// Parse the optional status filter. An unknown token is a validation error.
    pub fn status_filter(&self) -> Result<Option<RsvpStatus>, CoreError> {
        self.status.as_deref().map(str::parse::<RsvpStatus>).transpose()
    }
}
