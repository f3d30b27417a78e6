//! `PostgreSQL` implementation of the `SessionRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::error;
use uuid::Uuid;

use duet_core::error::DomainError;
use duet_core::repository::{SessionRepository, StoredSession};
use duet_core::turn::StoredTurn;

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    owner_id: Uuid,
    character_name: String,
    character_class: String,
    character_race: String,
    strength: i32,
    dexterity: i32,
    intelligence: i32,
    prologue: String,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for StoredSession {
    fn from(row: SessionRow) -> Self {
        Self {
            session_id: row.id,
            owner_id: row.owner_id,
            character_name: row.character_name,
            character_class: row.character_class,
            character_race: row.character_race,
            strength: row.strength,
            dexterity: row.dexterity,
            intelligence: row.intelligence,
            prologue: row.prologue,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TurnRow {
    turn_id: Uuid,
    session_id: Uuid,
    thread: String,
    role: String,
    content: String,
    sequence_number: i64,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<TurnRow> for StoredTurn {
    type Error = DomainError;

    fn try_from(row: TurnRow) -> Result<Self, Self::Error> {
        Ok(Self {
            turn_id: row.turn_id,
            session_id: row.session_id,
            thread: row.thread.parse().map_err(DomainError::Storage)?,
            role: row.role.parse().map_err(DomainError::Storage)?,
            content: row.content,
            sequence_number: row.sequence_number,
            occurred_at: row.occurred_at,
        })
    }
}

const SESSION_COLUMNS: &str = "id, owner_id, character_name, character_class, character_race, \
     strength, dexterity, intelligence, prologue, created_at";

fn storage_error(operation: &'static str, err: &sqlx::Error) -> DomainError {
    error!(operation, error = %err, "session store query failed");
    DomainError::Storage(format!("{operation} failed: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

async fn insert_turns(conn: &mut PgConnection, turns: &[StoredTurn]) -> Result<(), sqlx::Error> {
    for turn in turns {
        sqlx::query(
            "INSERT INTO turns (turn_id, session_id, thread, role, content, sequence_number, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(turn.turn_id)
        .bind(turn.session_id)
        .bind(turn.thread.as_str())
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.sequence_number)
        .bind(turn.occurred_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// PostgreSQL-backed session repository.
///
/// Every write runs in one transaction. Appends lock the session row first,
/// so concurrent appends to one session from different processes queue up
/// and the loser observes a moved sequence number.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Creates a new `PgSessionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn list_sessions(&self, owner_id: Uuid) -> Result<Vec<StoredSession>, DomainError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE owner_id = $1 \
             ORDER BY created_at DESC, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("list_sessions", &e))?;
        Ok(rows.into_iter().map(StoredSession::from).collect())
    }

    async fn load_session(&self, session_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        let row: Option<SessionRow> =
            sqlx::query_as(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("load_session", &e))?;
        Ok(row.map(StoredSession::from))
    }

    async fn load_turns(&self, session_id: Uuid) -> Result<Vec<StoredTurn>, DomainError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT turn_id, session_id, thread, role, content, sequence_number, occurred_at \
             FROM turns WHERE session_id = $1 ORDER BY sequence_number",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("load_turns", &e))?;
        rows.into_iter().map(StoredTurn::try_from).collect()
    }

    async fn create_session(
        &self,
        session: &StoredSession,
        turns: &[StoredTurn],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("create_session", &e))?;

        sqlx::query(
            "INSERT INTO sessions (id, owner_id, character_name, character_class, character_race, \
             strength, dexterity, intelligence, prologue, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(session.session_id)
        .bind(session.owner_id)
        .bind(&session.character_name)
        .bind(&session.character_class)
        .bind(&session.character_race)
        .bind(session.strength)
        .bind(session.dexterity)
        .bind(session.intelligence)
        .bind(&session.prologue)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DomainError::OwnerNotFound(session.owner_id)
            } else {
                storage_error("create_session", &e)
            }
        })?;

        insert_turns(&mut tx, turns)
            .await
            .map_err(|e| storage_error("create_session", &e))?;

        tx.commit()
            .await
            .map_err(|e| storage_error("create_session", &e))
    }

    async fn append_turns(
        &self,
        session_id: Uuid,
        expected_sequence: i64,
        turns: &[StoredTurn],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("append_turns", &e))?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM sessions WHERE id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| storage_error("append_turns", &e))?;
        if locked.is_none() {
            return Err(DomainError::SessionNotFound(session_id));
        }

        let actual: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM turns WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| storage_error("append_turns", &e))?;
        if actual != expected_sequence {
            return Err(DomainError::ConcurrencyConflict {
                session_id,
                expected: expected_sequence,
                actual,
            });
        }

        insert_turns(&mut tx, turns).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::ConcurrencyConflict {
                    session_id,
                    expected: expected_sequence,
                    actual,
                }
            } else {
                storage_error("append_turns", &e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| storage_error("append_turns", &e))
    }

    async fn delete_session(&self, session_id: Uuid, owner_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND owner_id = $2")
            .bind(session_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete_session", &e))?;
        Ok(result.rows_affected() > 0)
    }
}
