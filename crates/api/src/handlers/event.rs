//! Handlers for the `/events` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use campus_core::error::CoreError;
use campus_core::events::{validate_capacity, validate_title};
use campus_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use campus_core::types::DbId;
use campus_db::models::event::{CreateEvent, Event};
use campus_db::repositories::{EventRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/events
///
/// Create an event owned by the caller. `attending` always starts at zero.
pub async fn create_event(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<CreateEvent>,
) -> AppResult<impl IntoResponse> {
    validate_title(&input.title)?;
    validate_capacity(input.capacity)?;

    if UserRepo::find_by_id(&state.pool, user.user_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }));
    }

    let event = EventRepo::create(&state.pool, &input, Some(user.user_id)).await?;

    tracing::info!(
        event_id = event.id,
        user_id = user.user_id,
        capacity = event.capacity,
        "Event created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/events
///
/// List events newest-first, paginated.
pub async fn list_events(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);
    let events = EventRepo::list(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let event = find_event(&state, id).await?;
    Ok(Json(DataResponse { data: event }))
}

/// DELETE /api/v1/events/{id}
///
/// Only the event's creator or an admin may delete it. RSVP rows go with it.
pub async fn delete_event(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let event = find_event(&state, id).await?;
    if event.created_by != Some(user.user_id) && !user.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the event creator or an admin can delete this event".into(),
        )));
    }

    if !EventRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Event", id }));
    }

    tracing::info!(event_id = id, user_id = user.user_id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_event(state: &AppState, id: DbId) -> AppResult<Event> {
    EventRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Event", id }))
}
