//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::turn::ThreadTag;

/// Top-level domain error type.
///
/// Every variant aborts the action that produced it as a unit; nothing is
/// partially applied to the turn log.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// The owning user does not exist.
    #[error("owner not found: {0}")]
    OwnerNotFound(Uuid),

    /// The caller does not own the session.
    #[error("session {session_id} does not belong to the caller")]
    Forbidden {
        /// The session that was accessed.
        session_id: Uuid,
    },

    /// Another action was committed against the session first.
    #[error("concurrency conflict on session {session_id}: expected sequence {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The session that had the conflict.
        session_id: Uuid,
        /// The last sequence number the writer observed.
        expected: i64,
        /// The last sequence number actually stored.
        actual: i64,
    },

    /// Missing or malformed input, rejected before any external call.
    #[error("validation error: {0}")]
    Validation(String),

    /// One or both narrator calls failed or returned unusable output.
    #[error("generation error: {0}")]
    Generation(String),

    /// The stored turn log violates thread parity.
    #[error(
        "inconsistent history for session {session_id}: thread a has {thread_a} turns, thread b has {thread_b}"
    )]
    InconsistentHistory {
        /// The corrupt session.
        session_id: Uuid,
        /// Turn count in thread A.
        thread_a: usize,
        /// Turn count in thread B.
        thread_b: usize,
    },

    /// The store could not read or commit.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Failure of a single narrator call.
#[derive(Debug, Error)]
pub enum NarratorError {
    /// The request never produced a response.
    #[error("narrator request failed: {0}")]
    Request(String),

    /// The narrator answered with a non-success status.
    #[error("narrator returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response could not be interpreted as a narration.
    #[error("malformed narrator response: {0}")]
    MalformedResponse(String),
}

/// Failure of the joined dual-narrator call, tagged with the thread that
/// failed first.
#[derive(Debug, Error)]
#[error("narrator for thread {thread} failed: {source}")]
pub struct GenerationError {
    /// The thread whose narrator failed.
    pub thread: ThreadTag,
    /// The underlying failure.
    #[source]
    pub source: NarratorError,
}

impl From<GenerationError> for DomainError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err.to_string())
    }
}
