//! Narrator capability abstraction.

use async_trait::async_trait;

use crate::error::NarratorError;
use crate::turn::PromptTurn;

/// An external text-generation capability that continues a story.
///
/// Implementations are stateless request/response: given the system prompt
/// and the ordered turns of one thread, return the next narration. An empty
/// string is a valid (if dull) answer; failures are reported as
/// [`NarratorError`].
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Short label used in logs (typically the model name).
    fn name(&self) -> &str;

    /// Generates the next narrator turn.
    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[PromptTurn],
    ) -> Result<String, NarratorError>;
}
