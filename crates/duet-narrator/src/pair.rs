//! The dual-narrator invoker.
//!
//! Both narrators run concurrently on the current task and are joined with
//! `tokio::try_join!`: the first failure cancels the sibling call and is
//! reported for the whole pair. A caller never sees one narration without
//! the other.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use duet_core::error::GenerationError;
use duet_core::narrator::Narrator;
use duet_core::turn::{PromptTurn, ThreadTag};

/// Substituted when a narrator answers successfully with nothing.
pub const SILENT_NARRATOR: &str = "[the narrator falls silent...]";

/// The two narrations produced for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationPair {
    /// Narration for thread A.
    pub thread_a: String,
    /// Narration for thread B.
    pub thread_b: String,
}

impl NarrationPair {
    /// Returns the narration for `thread`.
    #[must_use]
    pub fn for_thread(&self, thread: ThreadTag) -> &str {
        match thread {
            ThreadTag::A => &self.thread_a,
            ThreadTag::B => &self.thread_b,
        }
    }
}

/// Two independent narrators, one per thread.
#[derive(Clone)]
pub struct NarratorPair {
    thread_a: Arc<dyn Narrator>,
    thread_b: Arc<dyn Narrator>,
}

impl std::fmt::Debug for NarratorPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarratorPair")
            .field("thread_a", &self.thread_a.name())
            .field("thread_b", &self.thread_b.name())
            .finish()
    }
}

impl NarratorPair {
    /// Pairs two narrators.
    #[must_use]
    pub fn new(thread_a: Arc<dyn Narrator>, thread_b: Arc<dyn Narrator>) -> Self {
        Self { thread_a, thread_b }
    }

    /// Runs both narrators concurrently and joins the results.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` tagged with the thread that failed first.
    #[instrument(skip_all, fields(thread_a = self.thread_a.name(), thread_b = self.thread_b.name()))]
    pub async fn invoke(
        &self,
        system_prompt: &str,
        thread_a: &[PromptTurn],
        thread_b: &[PromptTurn],
    ) -> Result<NarrationPair, GenerationError> {
        let (a, b) = tokio::try_join!(
            narrate(&*self.thread_a, ThreadTag::A, system_prompt, thread_a),
            narrate(&*self.thread_b, ThreadTag::B, system_prompt, thread_b),
        )?;
        debug!("both narrators answered");
        Ok(NarrationPair {
            thread_a: a,
            thread_b: b,
        })
    }
}

async fn narrate(
    narrator: &dyn Narrator,
    thread: ThreadTag,
    system_prompt: &str,
    turns: &[PromptTurn],
) -> Result<String, GenerationError> {
    match narrator.generate(system_prompt, turns).await {
        Ok(text) if text.trim().is_empty() => {
            debug!(%thread, narrator = narrator.name(), "empty narration, substituting sentinel");
            Ok(SILENT_NARRATOR.to_owned())
        }
        Ok(text) => Ok(text),
        Err(source) => {
            warn!(%thread, narrator = narrator.name(), error = %source, "narrator failed");
            Err(GenerationError { thread, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, Instant};

    use duet_core::error::NarratorError;
    use duet_test_support::ScriptedNarrator;

    fn pair(a: ScriptedNarrator, b: ScriptedNarrator) -> (NarratorPair, Arc<ScriptedNarrator>, Arc<ScriptedNarrator>) {
        let a = Arc::new(a);
        let b = Arc::new(b);
        (NarratorPair::new(a.clone(), b.clone()), a, b)
    }

    #[tokio::test]
    async fn test_invoke_returns_both_narrations_with_each_history() {
        // Arrange
        let (pair, a, b) = pair(
            ScriptedNarrator::replying("flash", "A wolf howls."),
            ScriptedNarrator::replying("pro", "Rain begins."),
        );
        let history_a = vec![PromptTurn::narrator("a0"), PromptTurn::user("go north")];
        let history_b = vec![PromptTurn::narrator("b0"), PromptTurn::user("go north")];

        // Act
        let result = pair.invoke("prompt", &history_a, &history_b).await.unwrap();

        // Assert
        assert_eq!(result.thread_a, "A wolf howls.");
        assert_eq!(result.thread_b, "Rain begins.");
        assert_eq!(a.calls()[0].1, history_a);
        assert_eq!(b.calls()[0].1, history_b);
        assert_eq!(a.calls()[0].0, "prompt");
    }

    #[tokio::test]
    async fn test_invoke_fails_as_unit_when_second_narrator_fails() {
        let (pair, _, _) = pair(
            ScriptedNarrator::replying("flash", "fine"),
            ScriptedNarrator::failing("pro", "quota"),
        );

        let err = pair
            .invoke("prompt", &[PromptTurn::user("x")], &[PromptTurn::user("x")])
            .await
            .unwrap_err();

        assert_eq!(err.thread, ThreadTag::B);
        assert!(matches!(err.source, NarratorError::Request(ref m) if m == "quota"));
    }

    #[tokio::test]
    async fn test_invoke_substitutes_sentinel_for_empty_narration() {
        let (pair, _, _) = pair(
            ScriptedNarrator::replying("flash", "   "),
            ScriptedNarrator::replying("pro", "Thunder."),
        );

        let result = pair
            .invoke("prompt", &[PromptTurn::user("x")], &[PromptTurn::user("x")])
            .await
            .unwrap();

        assert_eq!(result.thread_a, SILENT_NARRATOR);
        assert_eq!(result.for_thread(ThreadTag::B), "Thunder.");
    }

    #[tokio::test]
    async fn test_invoke_runs_narrators_concurrently() {
        let delay = Duration::from_millis(200);
        let (pair, _, _) = pair(
            ScriptedNarrator::replying("flash", "a").with_delay(delay),
            ScriptedNarrator::replying("pro", "b").with_delay(delay),
        );

        let started = Instant::now();
        pair.invoke("prompt", &[PromptTurn::user("x")], &[PromptTurn::user("x")])
            .await
            .unwrap();

        assert!(started.elapsed() < delay * 2);
    }

    #[tokio::test]
    async fn test_invoke_does_not_wait_for_slow_sibling_after_failure() {
        let (pair, _, _) = pair(
            ScriptedNarrator::replying("flash", "a").with_delay(Duration::from_secs(30)),
            ScriptedNarrator::failing("pro", "down"),
        );

        let started = Instant::now();
        let err = pair
            .invoke("prompt", &[PromptTurn::user("x")], &[PromptTurn::user("x")])
            .await
            .unwrap_err();

        assert_eq!(err.thread, ThreadTag::B);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
