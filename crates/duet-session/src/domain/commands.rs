//! Commands for the session context.

use duet_core::command::Command;
use duet_core::error::DomainError;
use uuid::Uuid;

use super::character::{Attributes, Character};

/// Longest accepted prologue, in characters.
pub const MAX_PROLOGUE_CHARS: usize = 4000;

/// Longest accepted player action, in characters.
pub const MAX_ACTION_CHARS: usize = 2000;

/// Command to start a new session and narrate its opening scene.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user creating the session.
    pub owner_id: Uuid,
    /// Who the player is.
    pub character: Character,
    /// Attribute allocation.
    pub attributes: Attributes,
    /// Adventure context handed to both narrators.
    pub prologue: String,
}

impl CreateSession {
    /// Rejects malformed input before any external call.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.character.validate()?;
        self.attributes.validate()?;
        if self.prologue.chars().count() > MAX_PROLOGUE_CHARS {
            return Err(DomainError::Validation(format!(
                "prologue must be at most {MAX_PROLOGUE_CHARS} characters"
            )));
        }
        Ok(())
    }
}

impl Command for CreateSession {
    fn command_type(&self) -> &'static str {
        "session.create_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Command to play one action against both narrators.
#[derive(Debug, Clone)]
pub struct AppendAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session being played.
    pub session_id: Uuid,
    /// The caller, who must own the session.
    pub owner_id: Uuid,
    /// What the player does, stored verbatim.
    pub action: String,
}

impl AppendAction {
    /// Rejects empty or oversized actions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` describing the problem.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.action.trim().is_empty() {
            return Err(DomainError::Validation("action text is required".into()));
        }
        if self.action.chars().count() > MAX_ACTION_CHARS {
            return Err(DomainError::Validation(format!(
                "action must be at most {MAX_ACTION_CHARS} characters"
            )));
        }
        Ok(())
    }
}

impl Command for AppendAction {
    fn command_type(&self) -> &'static str {
        "session.append_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Command to delete a session and its whole turn log.
#[derive(Debug, Clone)]
pub struct DeleteSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to delete.
    pub session_id: Uuid,
    /// The caller, who must own the session.
    pub owner_id: Uuid,
}

impl Command for DeleteSession {
    fn command_type(&self) -> &'static str {
        "session.delete_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}
