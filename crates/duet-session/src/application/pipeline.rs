//! The action pipeline.
//!
//! One player action moves through
//! `Idle → Validating → Generating → Persisting → Done`, or ends in
//! `Failed(kind)` at whichever stage went wrong. A pipeline value lives for
//! exactly one action; nothing carries over between actions.
//!
//! Nothing is written before `Persisting`, and the append there is a single
//! transaction, so every failure leaves the turn log untouched.

use std::time::Duration;

use duet_core::clock::Clock;
use duet_core::error::DomainError;
use duet_core::repository::SessionRepository;
use duet_core::turn::{PromptTurn, Role, StoredTurn, ThreadTag};
use duet_narrator::{NarrationPair, NarratorPair};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::locks::SessionLocks;
use crate::domain::commands::AppendAction;
use crate::domain::history::{ThreadHistories, reconstruct};
use crate::domain::prompt::system_prompt;
use crate::domain::snapshot::{Session, SessionSnapshot};

/// Why a pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed input.
    Validation,
    /// The caller does not own the session.
    Forbidden,
    /// The session does not exist.
    NotFound,
    /// A narrator failed or timed out.
    Generation,
    /// Another action committed first.
    Conflict,
    /// The stored log violates parity.
    InconsistentHistory,
    /// The store failed.
    Storage,
}

impl From<&DomainError> for FailureKind {
    fn from(err: &DomainError) -> Self {
        match err {
            DomainError::Validation(_) => Self::Validation,
            DomainError::Forbidden { .. } => Self::Forbidden,
            DomainError::SessionNotFound(_) | DomainError::OwnerNotFound(_) => Self::NotFound,
            DomainError::Generation(_) => Self::Generation,
            DomainError::ConcurrencyConflict { .. } => Self::Conflict,
            DomainError::InconsistentHistory { .. } => Self::InconsistentHistory,
            DomainError::Storage(_) => Self::Storage,
        }
    }
}

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStage {
    /// Not started.
    Idle,
    /// Checking input and ownership.
    Validating,
    /// Reconstructing histories and calling both narrators.
    Generating,
    /// Appending the four new turns.
    Persisting,
    /// Finished successfully.
    Done,
    /// Finished with an error; nothing was persisted.
    Failed(FailureKind),
}

/// Runs both narrators under a deadline.
///
/// # Errors
///
/// Returns `DomainError::Generation` if either narrator fails or the pair
/// does not answer within `timeout`.
pub(crate) async fn narrate_with_deadline(
    narrators: &NarratorPair,
    timeout: Duration,
    prompt: &str,
    thread_a: &[PromptTurn],
    thread_b: &[PromptTurn],
) -> Result<NarrationPair, DomainError> {
    match tokio::time::timeout(timeout, narrators.invoke(prompt, thread_a, thread_b)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(DomainError::Generation(format!(
            "narrators did not answer within {} seconds",
            timeout.as_secs()
        ))),
    }
}

/// Builds the stored turns for one narrated exchange, numbered from
/// `after + 1` in canonical order: user A, narrator A, user B, narrator B.
/// Opening narrations have no user turn.
pub(crate) fn exchange_turns(
    session_id: Uuid,
    after: i64,
    user_text: Option<&str>,
    narrations: &NarrationPair,
    clock: &dyn Clock,
) -> Vec<StoredTurn> {
    let occurred_at = clock.now();
    let mut turns = Vec::with_capacity(4);
    for thread in ThreadTag::ALL {
        if let Some(text) = user_text {
            turns.push((thread, Role::User, text.to_owned()));
        }
        turns.push((thread, Role::Narrator, narrations.for_thread(thread).to_owned()));
    }
    turns
        .into_iter()
        .zip(after + 1..)
        .map(|((thread, role, content), sequence_number)| StoredTurn {
            turn_id: Uuid::new_v4(),
            session_id,
            thread,
            role,
            content,
            sequence_number,
            occurred_at,
        })
        .collect()
}

/// Drives one `AppendAction` through the stages.
pub struct ActionPipeline<'a> {
    clock: &'a dyn Clock,
    repo: &'a dyn SessionRepository,
    narrators: &'a NarratorPair,
    locks: &'a SessionLocks,
    narrator_timeout: Duration,
    stage: ActionStage,
}

impl<'a> ActionPipeline<'a> {
    /// Creates an idle pipeline.
    #[must_use]
    pub fn new(
        clock: &'a dyn Clock,
        repo: &'a dyn SessionRepository,
        narrators: &'a NarratorPair,
        locks: &'a SessionLocks,
        narrator_timeout: Duration,
    ) -> Self {
        Self {
            clock,
            repo,
            narrators,
            locks,
            narrator_timeout,
            stage: ActionStage::Idle,
        }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> ActionStage {
        self.stage
    }

    fn enter(&mut self, stage: ActionStage) {
        debug!(from = ?self.stage, to = ?stage, "pipeline transition");
        self.stage = stage;
    }

    /// Runs the action to `Done` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns the `DomainError` of the stage that failed. The turn log is
    /// unchanged whenever an error is returned.
    #[instrument(skip_all, fields(session_id = %command.session_id, correlation_id = %command.correlation_id))]
    pub async fn run(&mut self, command: &AppendAction) -> Result<SessionSnapshot, DomainError> {
        match self.advance(command).await {
            Ok(snapshot) => {
                self.enter(ActionStage::Done);
                info!(
                    turns = snapshot.thread_a.len() + snapshot.thread_b.len(),
                    "action appended"
                );
                Ok(snapshot)
            }
            Err(err) => {
                let kind = FailureKind::from(&err);
                warn!(stage = ?self.stage, ?kind, error = %err, "action failed");
                self.stage = ActionStage::Failed(kind);
                Err(err)
            }
        }
    }

    async fn advance(&mut self, command: &AppendAction) -> Result<SessionSnapshot, DomainError> {
        self.enter(ActionStage::Validating);
        command.validate()?;
        let session = self.owned_session(command).await?;

        self.enter(ActionStage::Generating);
        // Held until the append commits so the history we extend is current.
        let _guard = self.locks.acquire(session.id).await;
        let mut histories = self.load_histories(session.id).await?;
        histories.check_parity(session.id)?;

        let prompt = system_prompt(&session.character, &session.attributes, &session.prologue);
        let mut thread_a = histories.prompt_turns(ThreadTag::A);
        let mut thread_b = histories.prompt_turns(ThreadTag::B);
        thread_a.push(PromptTurn::user(command.action.clone()));
        thread_b.push(PromptTurn::user(command.action.clone()));
        let narrations = narrate_with_deadline(
            self.narrators,
            self.narrator_timeout,
            &prompt,
            &thread_a,
            &thread_b,
        )
        .await?;

        self.enter(ActionStage::Persisting);
        let expected = histories.last_sequence();
        let turns = exchange_turns(
            session.id,
            expected,
            Some(&command.action),
            &narrations,
            self.clock,
        );
        self.repo.append_turns(session.id, expected, &turns).await?;

        // Committed. The lock is still held, so the log is exactly what we
        // loaded plus these turns; no further read may fail the action.
        histories.extend(&turns);
        Ok(SessionSnapshot::assemble(&session, &histories))
    }

    async fn owned_session(&self, command: &AppendAction) -> Result<Session, DomainError> {
        let stored = self
            .repo
            .load_session(command.session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(command.session_id))?;
        if stored.owner_id != command.owner_id {
            return Err(DomainError::Forbidden {
                session_id: command.session_id,
            });
        }
        Session::from_stored(&stored)
    }

    async fn load_histories(&self, session_id: Uuid) -> Result<ThreadHistories, DomainError> {
        let turns = self.repo.load_turns(session_id).await?;
        Ok(reconstruct(&turns))
    }
}
