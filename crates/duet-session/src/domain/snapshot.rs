//! Sessions and the merged snapshot returned to callers.

use chrono::{DateTime, Utc};
use duet_core::error::DomainError;
use duet_core::repository::StoredSession;
use duet_core::turn::{PromptTurn, ThreadTag};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::character::{Attributes, Character};
use super::history::ThreadHistories;

/// A session's immutable descriptive attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Who the player is.
    pub character: Character,
    /// Attribute allocation.
    pub attributes: Attributes,
    /// Adventure context.
    pub prologue: String,
}

fn score(value: i32, field: &str) -> Result<u8, DomainError> {
    u8::try_from(value)
        .map_err(|_| DomainError::Storage(format!("stored {field} out of range: {value}")))
}

impl Session {
    /// Parses a stored row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the row holds values the domain
    /// cannot represent.
    pub fn from_stored(stored: &StoredSession) -> Result<Self, DomainError> {
        let corrupt = |e: DomainError| DomainError::Storage(format!("corrupt session row: {e}"));
        Ok(Self {
            id: stored.session_id,
            owner_id: stored.owner_id,
            created_at: stored.created_at,
            character: Character {
                name: stored.character_name.clone(),
                class: stored.character_class.parse().map_err(corrupt)?,
                race: stored.character_race.parse().map_err(corrupt)?,
            },
            attributes: Attributes {
                strength: score(stored.strength, "strength")?,
                dexterity: score(stored.dexterity, "dexterity")?,
                intelligence: score(stored.intelligence, "intelligence")?,
            },
            prologue: stored.prologue.clone(),
        })
    }

    /// Storage form of the session row.
    #[must_use]
    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            session_id: self.id,
            owner_id: self.owner_id,
            character_name: self.character.name.clone(),
            character_class: self.character.class.as_str().to_owned(),
            character_race: self.character.race.as_str().to_owned(),
            strength: i32::from(self.attributes.strength),
            dexterity: i32::from(self.attributes.dexterity),
            intelligence: i32::from(self.attributes.intelligence),
            prologue: self.prologue.clone(),
            created_at: self.created_at,
        }
    }
}

/// The externally visible view of a session: its attributes plus both
/// reconstructed thread histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Who the player is.
    pub character: Character,
    /// Attribute allocation.
    pub attributes: Attributes,
    /// Adventure context.
    pub prologue: String,
    /// Thread A, oldest first.
    pub thread_a: Vec<PromptTurn>,
    /// Thread B, oldest first.
    pub thread_b: Vec<PromptTurn>,
}

impl SessionSnapshot {
    /// Merges a session with its histories.
    #[must_use]
    pub fn assemble(session: &Session, histories: &ThreadHistories) -> Self {
        Self {
            id: session.id,
            owner_id: session.owner_id,
            created_at: session.created_at,
            character: session.character.clone(),
            attributes: session.attributes,
            prologue: session.prologue.clone(),
            thread_a: histories.prompt_turns(ThreadTag::A),
            thread_b: histories.prompt_turns(ThreadTag::B),
        }
    }

    /// Returns one thread.
    #[must_use]
    pub fn thread(&self, thread: ThreadTag) -> &[PromptTurn] {
        match thread {
            ThreadTag::A => &self.thread_a,
            ThreadTag::B => &self.thread_b,
        }
    }

    /// Returns one thread for modification.
    pub fn thread_mut(&mut self, thread: ThreadTag) -> &mut Vec<PromptTurn> {
        match thread {
            ThreadTag::A => &mut self.thread_a,
            ThreadTag::B => &mut self.thread_b,
        }
    }
}
