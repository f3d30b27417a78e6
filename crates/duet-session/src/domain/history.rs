//! Per-thread projections of the flat turn log.

use duet_core::error::DomainError;
use duet_core::turn::{PromptTurn, Role, StoredTurn, ThreadTag};
use uuid::Uuid;

/// The two thread histories of one session, each ordered by sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadHistories {
    /// Turns of thread A.
    pub thread_a: Vec<StoredTurn>,
    /// Turns of thread B.
    pub thread_b: Vec<StoredTurn>,
}

/// Partitions a session's log by thread tag, preserving sequence order.
///
/// Pure: the input is not required to be sorted and is never modified.
#[must_use]
pub fn reconstruct(turns: &[StoredTurn]) -> ThreadHistories {
    let mut ordered: Vec<&StoredTurn> = turns.iter().collect();
    ordered.sort_by_key(|t| t.sequence_number);

    let mut histories = ThreadHistories::default();
    for turn in ordered {
        match turn.thread {
            ThreadTag::A => histories.thread_a.push(turn.clone()),
            ThreadTag::B => histories.thread_b.push(turn.clone()),
        }
    }
    histories
}

impl ThreadHistories {
    /// Returns one thread.
    #[must_use]
    pub fn thread(&self, thread: ThreadTag) -> &[StoredTurn] {
        match thread {
            ThreadTag::A => &self.thread_a,
            ThreadTag::B => &self.thread_b,
        }
    }

    /// Adds turns to the end of their threads. `turns` must follow the
    /// current log in sequence order.
    pub fn extend(&mut self, turns: &[StoredTurn]) {
        for turn in turns {
            match turn.thread {
                ThreadTag::A => self.thread_a.push(turn.clone()),
                ThreadTag::B => self.thread_b.push(turn.clone()),
            }
        }
    }

    /// Highest sequence number across both threads, or 0 for an empty log.
    #[must_use]
    pub fn last_sequence(&self) -> i64 {
        self.thread_a
            .iter()
            .chain(&self.thread_b)
            .map(|t| t.sequence_number)
            .max()
            .unwrap_or(0)
    }

    /// The `(role, text)` view of one thread.
    #[must_use]
    pub fn prompt_turns(&self, thread: ThreadTag) -> Vec<PromptTurn> {
        self.thread(thread)
            .iter()
            .map(StoredTurn::to_prompt_turn)
            .collect()
    }

    /// Checks the parity invariant: both threads hold the same number of
    /// turns and neither ends on an unanswered player turn.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InconsistentHistory` if the log was left
    /// half-written.
    pub fn check_parity(&self, session_id: Uuid) -> Result<(), DomainError> {
        let dangling = ThreadTag::ALL
            .iter()
            .any(|&tag| self.thread(tag).last().is_some_and(|t| t.role == Role::User));
        if self.thread_a.len() != self.thread_b.len() || dangling {
            return Err(DomainError::InconsistentHistory {
                session_id,
                thread_a: self.thread_a.len(),
                thread_b: self.thread_b.len(),
            });
        }
        Ok(())
    }
}
