use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{json_body, path_id, query_params};
use crate::auth::{enforce, Caller, Requirement};
use crate::models::{Event, EventChanges, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, no_content, success};

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub city: Option<String>,
}

#[derive(Serialize)]
struct JoinOutcome {
    event_id: Uuid,
    newly_joined: bool,
}

async fn load_event(state: &AppState, id: Uuid) -> Result<Event, AppError> {
    state
        .db
        .fetch_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", id)))
}

/// Load an event and make sure the caller is its promoter or an admin.
async fn load_managed_event(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> Result<Event, AppError> {
    let event = load_event(state, id).await?;
    enforce(caller, Some(event.promoter_id), Requirement::OwnerOrAdmin)?;
    Ok(event)
}

pub async fn create_event(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<Response, AppError> {
    let input = json_body(payload)?;
    input.validate()?;

    let event = Event::new(input, caller.id);
    state.db.insert_event(&event).await?;

    tracing::info!(event = %event.id, promoter = %caller.id, "Event created");
    Ok(created(event, "Event created"))
}

/// With a city, only unfinished events there, projected to a summary.
/// Without one, every event in full, finished ones included.
pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventListQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = query_params(query)?;
    match query.city.as_deref().map(str::trim) {
        Some(city) if !city.is_empty() => {
            let events = state.db.fetch_open_events_in_city(city).await?;
            Ok(success(events, "Open events in city"))
        }
        _ => {
            let events = state.db.fetch_events().await?;
            Ok(success(events, "All events"))
        }
    }
}

pub async fn event_details(
    State(state): State<AppState>,
    _caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    load_event(&state, id).await?;

    let attendees = state.db.fetch_attendees(id).await?;
    Ok(success(attendees, "List of attendees"))
}

pub async fn update_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<EventChanges>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    load_managed_event(&state, &caller, id).await?;

    let changes = json_body(payload)?;
    changes.validate()?;

    let event = state
        .db
        .update_event(id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", id)))?;

    tracing::info!(event = %id, caller = %caller.id, "Event updated");
    Ok(success(event, "Event updated"))
}

pub async fn close_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    load_managed_event(&state, &caller, id).await?;

    if !state.db.close_event(id).await? {
        return Err(AppError::NotFound(format!("Event '{}' was not found", id)));
    }

    tracing::info!(event = %id, caller = %caller.id, "Event closed");
    Ok(empty_success("Event has been closed"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    load_managed_event(&state, &caller, id).await?;

    if !state.db.delete_event(id).await? {
        return Err(AppError::NotFound(format!("Event '{}' was not found", id)));
    }

    tracing::info!(event = %id, caller = %caller.id, "Event deleted with its attendances");
    Ok(no_content())
}

pub async fn join_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    load_event(&state, id).await?;

    let newly_joined = state.db.join_event(id, caller.id).await?;
    if newly_joined {
        tracing::info!(event = %id, user = %caller.id, "Event joined");
    }

    Ok(success(
        JoinOutcome {
            event_id: id,
            newly_joined,
        },
        "Event joined!",
    ))
}

pub async fn leave_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;

    if state.db.leave_event(id, caller.id).await? {
        tracing::info!(event = %id, user = %caller.id, "Event left");
    }

    Ok(no_content())
}
