//! Routes for sessions and their actions.
//!
//! Every route acts for the caller named in the `x-owner-id` header.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use duet_session::application::{command_handlers, query_handlers};
use duet_session::domain::character::{Attributes, Character};
use duet_session::domain::commands;
use duet_session::domain::snapshot::SessionSnapshot;

use crate::error::ApiError;
use crate::extract::OwnerId;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Who the player is.
    pub character: Character,
    /// Attribute allocation; defaults to 7/7/6.
    #[serde(default)]
    pub attributes: Attributes,
    /// Adventure context.
    #[serde(default)]
    pub prologue: String,
}

/// Request body for POST /{session_id}/actions.
#[derive(Debug, Deserialize)]
pub struct AppendActionRequest {
    /// What the player does.
    pub action: String,
}

/// GET /
#[instrument(skip(state), fields(owner_id = %owner_id))]
async fn list_sessions(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<Vec<SessionSnapshot>>, ApiError> {
    let sessions = query_handlers::list_sessions(owner_id, &*state.session_repository).await?;
    Ok(Json(sessions))
}

/// POST /
#[instrument(skip(state, request), fields(owner_id = %owner_id))]
async fn create_session(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let command = commands::CreateSession {
        correlation_id: Uuid::new_v4(),
        owner_id,
        character: request.character,
        attributes: request.attributes,
        prologue: request.prologue,
    };

    info!(correlation_id = %command.correlation_id, "handling create_session command");

    let snapshot = command_handlers::handle_create_session(
        &command,
        state.clock.as_ref(),
        &*state.session_repository,
        &state.narrators,
        state.narrator_timeout,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /{session_id}
#[instrument(skip(state), fields(session_id = %session_id))]
async fn get_session(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot =
        query_handlers::get_session(session_id, owner_id, &*state.session_repository).await?;
    Ok(Json(snapshot))
}

/// POST /{session_id}/actions
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn append_action(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AppendActionRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let command = commands::AppendAction {
        correlation_id: Uuid::new_v4(),
        session_id,
        owner_id,
        action: request.action,
    };

    info!(correlation_id = %command.correlation_id, "handling append_action command");

    let snapshot = command_handlers::handle_append_action(
        command,
        Arc::clone(&state.clock),
        Arc::clone(&state.session_repository),
        Arc::clone(&state.narrators),
        state.locks.clone(),
        state.narrator_timeout,
    )
    .await?;

    Ok(Json(snapshot))
}

/// DELETE /{session_id}
#[instrument(skip(state), fields(session_id = %session_id))]
async fn delete_session(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteSession {
        correlation_id: Uuid::new_v4(),
        session_id,
        owner_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_session command");

    command_handlers::handle_delete_session(&command, &*state.session_repository, &state.locks)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the sessions resource.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{session_id}", get(get_session).delete(delete_session))
        .route("/{session_id}/actions", post(append_action))
}
