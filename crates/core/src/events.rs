//! Event constants and validation used by the API and repository layers.

use crate::error::CoreError;

/// Maximum length of an event title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Upper bound on event capacity accepted at creation.
pub const MAX_CAPACITY: i32 = 100_000;

/// Validate an event title: non-blank and at most [`MAX_TITLE_LEN`] characters.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Event title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Event title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate an event capacity: strictly positive and at most [`MAX_CAPACITY`].
pub fn validate_capacity(capacity: i32) -> Result<(), CoreError> {
    if capacity <= 0 {
        return Err(CoreError::Validation(format!(
            "Event capacity must be positive, got {capacity}"
        )));
    }
    if capacity > MAX_CAPACITY {
        return Err(CoreError::Validation(format!(
            "Event capacity must be at most {MAX_CAPACITY}, got {capacity}"
        )));
    }
    Ok(())
}

/// Remaining spots given a capacity and the current `going` count. Never negative.
pub fn spots_left(capacity: i32, attending: i32) -> i32 {
    (capacity - attending).max(0)
}
