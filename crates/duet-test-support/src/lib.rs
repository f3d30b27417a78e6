//! Shared test mocks and utilities for the Duet dual-narrator engine.

mod clock;
mod narrator;
mod repository;

pub use clock::FixedClock;
pub use narrator::ScriptedNarrator;
pub use repository::{FailingSessionRepository, InMemorySessionRepository, stored_session};
