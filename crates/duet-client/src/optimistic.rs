//! Optimistic session state for a front end.
//!
//! A submitted action shows up in both threads immediately. When the server
//! answers, its snapshot replaces the local one wholesale; when it fails, the
//! snapshot from before the submission comes back exactly as it was.
//!
//! ```text
//! Stable(s) --submit--> Speculative(s + user turn)
//! Speculative --confirm--> Stable(server snapshot)
//! Speculative --fail/cancel--> Stable(s)
//! ```

use std::fmt;

use duet_core::turn::{PromptTurn, Role, ThreadTag};
use duet_session::domain::snapshot::SessionSnapshot;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Identifies one submission. Answers for any ticket other than the one in
/// flight are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionTicket(u64);

/// What happened to a server answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The server snapshot replaced the speculative one.
    Committed,
    /// The pre-submit snapshot was restored.
    RolledBack,
    /// The answer belonged to an abandoned submission and was ignored.
    Discarded,
}

#[derive(Debug, Clone)]
enum Phase {
    Stable,
    Speculative {
        ticket: SubmissionTicket,
        action: String,
        previous: Box<SessionSnapshot>,
    },
}

/// One session as displayed by a client.
#[derive(Debug, Clone)]
pub struct OptimisticSession {
    displayed: SessionSnapshot,
    phase: Phase,
    next_ticket: u64,
    last_error: Option<String>,
}

impl OptimisticSession {
    /// Starts from a snapshot loaded from the server.
    #[must_use]
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            displayed: snapshot,
            phase: Phase::Stable,
            next_ticket: 0,
            last_error: None,
        }
    }

    /// The snapshot to render, including any speculative user turn.
    #[must_use]
    pub fn displayed(&self) -> &SessionSnapshot {
        &self.displayed
    }

    /// Whether a new action may be submitted.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::Stable)
    }

    /// The action awaiting an answer, if any.
    #[must_use]
    pub fn pending_action(&self) -> Option<&str> {
        match &self.phase {
            Phase::Stable => None,
            Phase::Speculative { action, .. } => Some(action),
        }
    }

    /// The message of the last failed submission.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Clears the displayed error.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Appends `action` to both displayed threads and blocks further
    /// submissions until the returned ticket is settled.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::SubmissionInFlight` if another action is pending
    /// and `ClientError::Validation` if `action` is blank.
    pub fn submit(&mut self, action: &str) -> Result<SubmissionTicket, ClientError> {
        if !self.can_submit() {
            return Err(ClientError::SubmissionInFlight);
        }
        if action.trim().is_empty() {
            return Err(ClientError::Validation("action text is required".into()));
        }

        let ticket = SubmissionTicket(self.next_ticket);
        self.next_ticket += 1;
        let previous = Box::new(self.displayed.clone());
        for thread in ThreadTag::ALL {
            self.displayed
                .thread_mut(thread)
                .push(PromptTurn::user(action));
        }
        self.dismiss_error();
        self.phase = Phase::Speculative {
            ticket,
            action: action.to_owned(),
            previous,
        };
        debug!(?ticket, "action submitted");
        Ok(ticket)
    }

    /// Settles `ticket` with the server's snapshot.
    ///
    /// The snapshot must belong to this session and end both threads with the
    /// submitted action followed by a narration; otherwise the submission is
    /// rolled back.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Mismatched` after rolling back if the snapshot
    /// does not confirm the action.
    pub fn confirm(
        &mut self,
        ticket: SubmissionTicket,
        server: SessionSnapshot,
    ) -> Result<Reconciliation, ClientError> {
        let Some(action) = self.in_flight(ticket).map(str::to_owned) else {
            return Ok(Reconciliation::Discarded);
        };
        if let Err(reason) = self.check_confirms(&server, &action) {
            self.roll_back(reason.clone());
            return Err(ClientError::Mismatched(reason));
        }
        self.displayed = server;
        self.phase = Phase::Stable;
        debug!(?ticket, "action committed");
        Ok(Reconciliation::Committed)
    }

    /// Settles `ticket` as failed: restores the pre-submit snapshot and
    /// records `error` for display.
    pub fn fail(&mut self, ticket: SubmissionTicket, error: &impl fmt::Display) -> Reconciliation {
        if self.in_flight(ticket).is_none() {
            return Reconciliation::Discarded;
        }
        self.roll_back(error.to_string());
        Reconciliation::RolledBack
    }

    /// Abandons the submission in flight, if any. A later answer for it is
    /// discarded.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.phase, Phase::Stable) {
            Phase::Stable => false,
            Phase::Speculative { previous, .. } => {
                self.displayed = *previous;
                true
            }
        }
    }

    fn in_flight(&self, ticket: SubmissionTicket) -> Option<&str> {
        match &self.phase {
            Phase::Speculative {
                ticket: current,
                action,
                ..
            } if *current == ticket => Some(action),
            _ => None,
        }
    }

    fn roll_back(&mut self, message: String) {
        if let Phase::Speculative { previous, .. } =
            std::mem::replace(&mut self.phase, Phase::Stable)
        {
            self.displayed = *previous;
        }
        warn!(error = %message, "action rolled back");
        self.last_error = Some(message);
    }

    fn check_confirms(&self, server: &SessionSnapshot, action: &str) -> Result<(), String> {
        if server.id != self.displayed.id {
            return Err(format!("expected session {}, got {}", self.displayed.id, server.id));
        }
        for thread in ThreadTag::ALL {
            match server.thread(thread) {
                [.., user, narrator]
                    if user.role == Role::User
                        && user.text == action
                        && narrator.role == Role::Narrator => {}
                _ => return Err(format!("thread {thread} does not end with the action and a reply")),
            }
        }
        Ok(())
    }
}
