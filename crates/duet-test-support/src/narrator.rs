//! Test narrators — scripted `Narrator` implementations for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use duet_core::error::NarratorError;
use duet_core::narrator::Narrator;
use duet_core::turn::PromptTurn;

/// A narrator that returns a configured reply (or failure) and records every
/// call it receives.
#[derive(Debug)]
pub struct ScriptedNarrator {
    name: String,
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Vec<PromptTurn>)>>,
}

impl ScriptedNarrator {
    /// A narrator that always answers `reply`.
    #[must_use]
    pub fn replying(name: &str, reply: &str) -> Self {
        Self::new(name, Ok(reply.to_owned()))
    }

    /// A narrator that always fails with `NarratorError::Request(message)`.
    #[must_use]
    pub fn failing(name: &str, message: &str) -> Self {
        Self::new(name, Err(message.to_owned()))
    }

    fn new(name: &str, reply: Result<String, String>) -> Self {
        Self {
            name: name.to_owned(),
            reply,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a copy of every `(system_prompt, turns)` pair received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<(String, Vec<PromptTurn>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[PromptTurn],
    ) -> Result<String, NarratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_owned(), turns.to_vec()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(NarratorError::Request)
    }
}
