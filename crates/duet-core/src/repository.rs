//! Session repository abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::turn::StoredTurn;

/// Stored representation of a session row.
///
/// Character fields are kept in their storage form; the session context
/// parses them into domain types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    /// Session identifier.
    pub session_id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Character name.
    pub character_name: String,
    /// Character class, storage form.
    pub character_class: String,
    /// Character race, storage form.
    pub character_race: String,
    /// Strength score.
    pub strength: i32,
    /// Dexterity score.
    pub dexterity: i32,
    /// Intelligence score.
    pub intelligence: i32,
    /// Adventure prologue.
    pub prologue: String,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

/// Repository trait for sessions and their turn log.
///
/// Implementations are the only writers of the persistent store. Every
/// mutating method is all-or-nothing.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Lists the sessions owned by `owner_id`, newest first.
    async fn list_sessions(&self, owner_id: Uuid) -> Result<Vec<StoredSession>, DomainError>;

    /// Loads one session row, if it exists.
    async fn load_session(&self, session_id: Uuid) -> Result<Option<StoredSession>, DomainError>;

    /// Loads every turn of a session, ordered by sequence number.
    async fn load_turns(&self, session_id: Uuid) -> Result<Vec<StoredTurn>, DomainError>;

    /// Inserts a session row together with its opening turns in one
    /// transaction.
    async fn create_session(
        &self,
        session: &StoredSession,
        turns: &[StoredTurn],
    ) -> Result<(), DomainError>;

    /// Appends turns to a session in one transaction.
    ///
    /// `expected_sequence` is the last sequence number the caller observed;
    /// if another writer got there first the append fails with
    /// `DomainError::ConcurrencyConflict` and nothing is written.
    async fn append_turns(
        &self,
        session_id: Uuid,
        expected_sequence: i64,
        turns: &[StoredTurn],
    ) -> Result<(), DomainError>;

    /// Deletes a session owned by `owner_id` along with its turns. Returns
    /// `false` when no such session exists for that owner.
    async fn delete_session(&self, session_id: Uuid, owner_id: Uuid) -> Result<bool, DomainError>;
}
