//! Handlers for event RSVPs.
//!
//! Every mutation goes through [`RsvpManager`](campus_core::rsvp::RsvpManager)
//! wrapped in the configured retry policy, so transient lock contention is
//! absorbed here and only surfaces as 503 once retries run out.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use campus_core::rsvp::RsvpStatus;
use campus_core::types::DbId;
use campus_db::models::rsvp::UpsertRsvp;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::query::RsvpListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/events/{id}/rsvp
///
/// Set the caller's RSVP. Re-sending the current status changes nothing.
pub async fn upsert_my_rsvp(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    Json(input): Json<UpsertRsvp>,
) -> AppResult<impl IntoResponse> {
    let status: RsvpStatus = input.status.parse()?;

    let rsvp = state
        .retry
        .run(|| state.rsvp.upsert_rsvp(event_id, user.user_id, status))
        .await?;

    Ok(Json(DataResponse { data: rsvp }))
}

/// GET /api/v1/events/{id}/rsvp
///
/// The caller's RSVP, or 204 if they have not responded.
pub async fn get_my_rsvp(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rsvp = state.rsvp.get_user_status(event_id, user.user_id).await?;

    match rsvp {
        Some(r) => Ok(Json(DataResponse { data: r }).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// DELETE /api/v1/events/{id}/rsvp
///
/// Withdraw the caller's RSVP. Succeeds whether or not one existed.
pub async fn withdraw_my_rsvp(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state
        .retry
        .run(|| state.rsvp.withdraw_rsvp(event_id, user.user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/events/{id}/rsvps
///
/// All RSVPs for the event, oldest change first. Supports `?status=`.
pub async fn list_rsvps(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    Query(params): Query<RsvpListParams>,
) -> AppResult<impl IntoResponse> {
    let status = params.status_filter()?;
    let rsvps = state.rsvp.list_attendees(event_id, status).await?;
    Ok(Json(DataResponse { data: rsvps }))
}

/// GET /api/v1/events/{id}/rsvps/counts
pub async fn count_rsvps(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let counts = state.rsvp.count_by_status(event_id).await?;
    Ok(Json(DataResponse { data: counts }))
}

/// GET /api/v1/events/{id}/rsvps/summary
///
/// Capacity, cached `attending`, live counts, and whether the two agree.
pub async fn attendance_summary(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let summary = state.rsvp.attendance_summary(event_id).await?;
    Ok(Json(DataResponse { data: summary }))
}
