use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::response::Response;
use uuid::Uuid;

use super::{json_body, path_id};
use crate::auth::{enforce, Caller, Requirement};
use crate::models::ProfileChanges;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::password::hash_password_blocking;
use crate::utils::response::{no_content, success};

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User '{}' was not found", id))
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ProfileChanges>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    enforce(&caller, Some(id), Requirement::OwnerOrAdmin)?;

    let changes = json_body(payload)?;
    changes.validate()?;

    let password_hash = match changes.password {
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };

    let user = state
        .db
        .update_profile(id, password_hash, changes.level)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    tracing::info!(user = %id, caller = %caller.id, "Profile updated");
    Ok(success(user.profile(), "Profile updated"))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    enforce(&caller, Some(id), Requirement::OwnerOrAdmin)?;

    if !state.db.delete_user(id).await? {
        return Err(user_not_found(id));
    }

    tracing::info!(user = %id, caller = %caller.id, "Account deleted");
    Ok(no_content())
}

pub async fn joined_events(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Response, AppError> {
    let events = state.db.fetch_joined_events(caller.id).await?;
    Ok(success(events, "Joined events"))
}

pub async fn promoted_events(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Response, AppError> {
    let events = state.db.fetch_promoted_events(caller.id).await?;
    Ok(success(events, "Promoted events"))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Response, AppError> {
    let users = state.db.fetch_user_profiles().await?;
    Ok(success(users, "All users"))
}

pub async fn user_detail(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = path_id(path)?;
    let user = state
        .db
        .fetch_user(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    Ok(success(user.profile(), "User profile"))
}
