//! Route definitions for events and their RSVPs, mounted at `/events`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{event, rsvp};
use crate::state::AppState;

/// ```text
/// GET    /                      -> list_events
/// POST   /                      -> create_event
/// GET    /{id}                  -> get_event
/// DELETE /{id}                  -> delete_event
/// GET    /{id}/rsvp             -> get_my_rsvp
/// PUT    /{id}/rsvp             -> upsert_my_rsvp
/// DELETE /{id}/rsvp             -> withdraw_my_rsvp
/// GET    /{id}/rsvps            -> list_rsvps
/// GET    /{id}/rsvps/counts     -> count_rsvps
/// GET    /{id}/rsvps/summary    -> attendance_summary
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(event::list_events).post(event::create_event))
        .route("/{id}", get(event::get_event).delete(event::delete_event))
        .route(
            "/{id}/rsvp",
            get(rsvp::get_my_rsvp)
                .put(rsvp::upsert_my_rsvp)
                .delete(rsvp::withdraw_my_rsvp),
        )
        .route("/{id}/rsvps", get(rsvp::list_rsvps))
        .route("/{id}/rsvps/counts", get(rsvp::count_rsvps))
        .route("/{id}/rsvps/summary", get(rsvp::attendance_summary))
}
