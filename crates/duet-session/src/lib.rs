//! Duet — sessions and the dual-narrator action pipeline.
//!
//! Responsible for character creation, the per-session turn log and its
//! two thread projections, and the pipeline that drives one player action
//! through both narrators and persists the outcome atomically.

pub mod application;
pub mod domain;
