//! Turn log primitives.
//!
//! A session's story lives in one flat, append-only log of turns. Each turn
//! is tagged with the narrator thread it belongs to; per-thread histories
//! are projections of that log, never stored on their own.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two narrator threads attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadTag {
    /// The first narrator's thread.
    A,
    /// The second narrator's thread.
    B,
}

impl ThreadTag {
    /// Both threads, in canonical insertion order.
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl fmt::Display for ThreadTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            other => Err(format!("unknown thread tag: {other}")),
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The player.
    User,
    /// A narrator.
    Narrator,
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Narrator => "narrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "narrator" => Ok(Self::Narrator),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A `(role, text)` pair as seen by a narrator or a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTurn {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub text: String,
}

impl PromptTurn {
    /// A player turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// A narrator turn.
    #[must_use]
    pub fn narrator(text: impl Into<String>) -> Self {
        Self {
            role: Role::Narrator,
            text: text.into(),
        }
    }
}

/// Stored representation of one entry in the turn log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTurn {
    /// Unique turn identifier.
    pub turn_id: Uuid,
    /// Session this turn belongs to.
    pub session_id: Uuid,
    /// Narrator thread.
    pub thread: ThreadTag,
    /// Speaker.
    pub role: Role,
    /// Text payload.
    pub content: String,
    /// Position within the session's log, starting at 1.
    pub sequence_number: i64,
    /// Timestamp of creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredTurn {
    /// Projects the turn to the `(role, text)` pair narrators consume.
    #[must_use]
    pub fn to_prompt_turn(&self) -> PromptTurn {
        PromptTurn {
            role: self.role,
            text: self.content.clone(),
        }
    }
}
