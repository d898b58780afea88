pub mod event;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events                          list, create
/// /events/{id}                     get, delete
/// /events/{id}/rsvp                get, set (PUT), withdraw (DELETE) own RSVP
/// /events/{id}/rsvps               list attendees (?status=)
/// /events/{id}/rsvps/counts        count by status
/// /events/{id}/rsvps/summary       attendance summary
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/events", event::router())
}
