//! Domain model for the session context.

pub mod character;
pub mod commands;
pub mod history;
pub mod prompt;
pub mod snapshot;
