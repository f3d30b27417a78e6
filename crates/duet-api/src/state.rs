//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use duet_core::clock::Clock;
use duet_core::repository::SessionRepository;
use duet_narrator::NarratorPair;
use duet_session::application::locks::SessionLocks;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock>,
    /// Session and turn storage.
    pub session_repository: Arc<dyn SessionRepository>,
    /// The two narrators.
    pub narrators: Arc<NarratorPair>,
    /// Per-session write locks.
    pub locks: SessionLocks,
    /// Deadline for the joined narrator call.
    pub narrator_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("narrators", &self.narrators)
            .field("locks", &self.locks)
            .field("narrator_timeout", &self.narrator_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        session_repository: Arc<dyn SessionRepository>,
        narrators: NarratorPair,
        narrator_timeout: Duration,
    ) -> Self {
        Self {
            clock,
            session_repository,
            narrators: Arc::new(narrators),
            locks: SessionLocks::new(),
            narrator_timeout,
        }
    }
}
