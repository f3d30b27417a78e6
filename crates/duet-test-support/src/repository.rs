//! Test repositories — mock `SessionRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_core::error::DomainError;
use duet_core::repository::{SessionRepository, StoredSession};
use duet_core::turn::StoredTurn;
use uuid::Uuid;

/// Builds a `StoredSession` with a valid default character.
#[must_use]
pub fn stored_session(session_id: Uuid, owner_id: Uuid, created_at: DateTime<Utc>) -> StoredSession {
    StoredSession {
        session_id,
        owner_id,
        character_name: "Tav".to_owned(),
        character_class: "fighter".to_owned(),
        character_race: "human".to_owned(),
        strength: 7,
        dexterity: 7,
        intelligence: 6,
        prologue: "A noisy tavern on the Sword Coast.".to_owned(),
        created_at,
    }
}

#[derive(Debug, Default)]
struct State {
    sessions: Vec<StoredSession>,
    turns: Vec<StoredTurn>,
    fail_creates: bool,
    fail_appends_after: Option<usize>,
}

/// A transactional in-memory repository.
///
/// Writes are staged and only become visible when the whole batch succeeds,
/// so injected failures leave the log exactly as it was.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    state: Mutex<State>,
}

impl InMemorySessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a session row and turns directly, bypassing every check.
    /// Useful for building corrupt logs.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, session: StoredSession, turns: Vec<StoredTurn>) {
        let mut state = self.state.lock().unwrap();
        state.sessions.push(session);
        state.turns.extend(turns);
    }

    /// Makes every subsequent `create_session` fail after staging its rows.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_creates(&self) {
        self.state.lock().unwrap().fail_creates = true;
    }

    /// Makes every subsequent `append_turns` fail after staging `staged`
    /// turns, simulating a crash in the middle of the insert.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_appends_after(&self, staged: usize) {
        self.state.lock().unwrap().fail_appends_after = Some(staged);
    }

    /// Returns a copy of every committed turn, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn turns(&self) -> Vec<StoredTurn> {
        self.state.lock().unwrap().turns.clone()
    }

    /// Returns a copy of every committed session row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sessions(&self) -> Vec<StoredSession> {
        self.state.lock().unwrap().sessions.clone()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn list_sessions(&self, owner_id: Uuid) -> Result<Vec<StoredSession>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut owned: Vec<StoredSession> = state
            .sessions
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn load_session(&self, session_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    async fn load_turns(&self, session_id: Uuid) -> Result<Vec<StoredTurn>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut turns: Vec<StoredTurn> = state
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.sequence_number);
        Ok(turns)
    }

    async fn create_session(
        &self,
        session: &StoredSession,
        turns: &[StoredTurn],
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(DomainError::Storage("injected create failure".into()));
        }
        state.sessions.push(session.clone());
        state.turns.extend_from_slice(turns);
        Ok(())
    }

    async fn append_turns(
        &self,
        session_id: Uuid,
        expected_sequence: i64,
        turns: &[StoredTurn],
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        if !state.sessions.iter().any(|s| s.session_id == session_id) {
            return Err(DomainError::SessionNotFound(session_id));
        }
        let actual = state
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .map(|t| t.sequence_number)
            .max()
            .unwrap_or(0);
        if actual != expected_sequence {
            return Err(DomainError::ConcurrencyConflict {
                session_id,
                expected: expected_sequence,
                actual,
            });
        }

        let mut staged = Vec::with_capacity(turns.len());
        for turn in turns {
            if state.fail_appends_after == Some(staged.len()) {
                // Staged rows are dropped with the transaction.
                return Err(DomainError::Storage("injected append failure".into()));
            }
            staged.push(turn.clone());
        }
        state.turns.extend(staged);
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid, owner_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state.lock().unwrap();
        let before = state.sessions.len();
        state
            .sessions
            .retain(|s| !(s.session_id == session_id && s.owner_id == owner_id));
        if state.sessions.len() == before {
            return Ok(false);
        }
        state.turns.retain(|t| t.session_id != session_id);
        Ok(true)
    }
}

/// A repository that always returns a storage error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingSessionRepository;

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn list_sessions(&self, _owner_id: Uuid) -> Result<Vec<StoredSession>, DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }

    async fn load_session(&self, _session_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }

    async fn load_turns(&self, _session_id: Uuid) -> Result<Vec<StoredTurn>, DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }

    async fn create_session(
        &self,
        _session: &StoredSession,
        _turns: &[StoredTurn],
    ) -> Result<(), DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }

    async fn append_turns(
        &self,
        _session_id: Uuid,
        _expected_sequence: i64,
        _turns: &[StoredTurn],
    ) -> Result<(), DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }

    async fn delete_session(&self, _session_id: Uuid, _owner_id: Uuid) -> Result<bool, DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }
}
