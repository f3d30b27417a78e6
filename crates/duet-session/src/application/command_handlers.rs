//! Command handlers for the session context.
//!
//! Each handler validates its command, talks to the narrators when the
//! command needs narration, and persists the outcome in one repository call.

use std::sync::Arc;
use std::time::Duration;

use duet_core::clock::Clock;
use duet_core::command::Command;
use duet_core::error::DomainError;
use duet_core::repository::SessionRepository;
use duet_core::turn::PromptTurn;
use duet_narrator::NarratorPair;
use tracing::{Instrument, error, info, instrument};
use uuid::Uuid;

use super::locks::SessionLocks;
use super::pipeline::{ActionPipeline, exchange_turns, narrate_with_deadline};
use crate::domain::character::Character;
use crate::domain::commands::{AppendAction, CreateSession, DeleteSession};
use crate::domain::history::reconstruct;
use crate::domain::prompt::{OPENING_TURN, system_prompt};
use crate::domain::snapshot::{Session, SessionSnapshot};

/// Handles the `CreateSession` command: asks both narrators for the opening
/// scene and stores the session with its two opening turns.
///
/// The scripted opening request is sent to the narrators but not stored, so
/// each thread starts with a single narrator turn.
///
/// # Errors
///
/// Returns `DomainError::Validation` for malformed input,
/// `DomainError::Generation` if either narrator fails or times out, and any
/// error from `create_session`. Nothing is stored on failure.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, owner_id = %command.owner_id))]
pub async fn handle_create_session(
    command: &CreateSession,
    clock: &dyn Clock,
    repo: &dyn SessionRepository,
    narrators: &NarratorPair,
    narrator_timeout: Duration,
) -> Result<SessionSnapshot, DomainError> {
    command.validate()?;

    let session = Session {
        id: Uuid::new_v4(),
        owner_id: command.owner_id,
        created_at: clock.now(),
        character: Character {
            name: command.character.name.trim().to_owned(),
            ..command.character.clone()
        },
        attributes: command.attributes,
        prologue: command.prologue.trim().to_owned(),
    };

    let prompt = system_prompt(&session.character, &session.attributes, &session.prologue);
    let opening = [PromptTurn::user(OPENING_TURN)];
    let narrations =
        narrate_with_deadline(narrators, narrator_timeout, &prompt, &opening, &opening).await?;

    let turns = exchange_turns(session.id, 0, None, &narrations, clock);
    repo.create_session(&session.to_stored(), &turns).await?;
    info!(session_id = %session.id, command_type = command.command_type(), "session created");

    Ok(SessionSnapshot::assemble(&session, &reconstruct(&turns)))
}

/// Handles the `AppendAction` command by running it through a fresh
/// [`ActionPipeline`].
///
/// The pipeline runs on its own task. Dropping the returned future (a client
/// hanging up) only discards the result; the action still completes or fails
/// as a whole.
///
/// # Errors
///
/// Returns the error of the pipeline stage that failed; the turn log is left
/// unchanged.
pub async fn handle_append_action(
    command: AppendAction,
    clock: Arc<dyn Clock>,
    repo: Arc<dyn SessionRepository>,
    narrators: Arc<NarratorPair>,
    locks: SessionLocks,
    narrator_timeout: Duration,
) -> Result<SessionSnapshot, DomainError> {
    let correlation_id = command.correlation_id;
    info!(%correlation_id, command_type = command.command_type(), "dispatching command");

    let task = tokio::spawn(
        async move {
            ActionPipeline::new(
                clock.as_ref(),
                repo.as_ref(),
                &narrators,
                &locks,
                narrator_timeout,
            )
            .run(&command)
            .await
        }
        .in_current_span(),
    );

    task.await.map_err(|err| {
        error!(%correlation_id, error = %err, "action task did not finish");
        DomainError::Storage(format!("action task did not finish: {err}"))
    })?
}

/// Handles the `DeleteSession` command: removes the session and its log.
///
/// Waits for any in-flight action on the session to finish first.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist or
/// belongs to someone else.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, session_id = %command.session_id))]
pub async fn handle_delete_session(
    command: &DeleteSession,
    repo: &dyn SessionRepository,
    locks: &SessionLocks,
) -> Result<(), DomainError> {
    let _guard = locks.acquire(command.session_id).await;
    if !repo
        .delete_session(command.session_id, command.owner_id)
        .await?
    {
        return Err(DomainError::SessionNotFound(command.session_id));
    }
    info!(command_type = command.command_type(), "session deleted");
    Ok(())
}
