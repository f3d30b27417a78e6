//! Application layer: command handlers, queries and the action pipeline.

pub mod command_handlers;
pub mod locks;
pub mod pipeline;
pub mod query_handlers;
