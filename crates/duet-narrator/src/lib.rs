//! Duet Narrator — narrator clients and the dual invoker.
//!
//! [`GeminiNarrator`] speaks the Gemini `generateContent` API.
//! [`NarratorPair`] fans a single action out to two narrators and joins
//! the results with all-or-nothing semantics.

pub mod gemini;
pub mod pair;

pub use gemini::{GeminiConfig, GeminiNarrator};
pub use pair::{NarrationPair, NarratorPair, SILENT_NARRATOR};
