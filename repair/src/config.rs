//! Configuration for one repair run.

use crate::classify::DEFAULT_CONTENT_DEFECT_MARKER;
use crate::prompt::DEFAULT_RETRY_PHRASE;
use std::time::Duration;

/// Configuration for one repair run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of chat calls (default: 5, never below 1).
    pub max_attempts: usize,
    /// Wrap the user's prompt in the invent-then-diagram template (default: false).
    pub improve_prompt: bool,
    /// Up to two extra instructions appended when `improve_prompt` is on.
    pub prompt_augmentations: Vec<String>,
    /// Sentence appended to the prompt after a content defect.
    pub failure_retry_phrase: String,
    /// Pause before re-asking the model (default: 1 s).
    pub retry_pause: Duration,
    /// Substrings in renderer output that mark a fixable content defect.
    pub content_defect_markers: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            improve_prompt: false,
            prompt_augmentations: Vec::new(),
            failure_retry_phrase: DEFAULT_RETRY_PHRASE.to_string(),
            retry_pause: Duration::from_secs(1),
            content_defect_markers: vec![DEFAULT_CONTENT_DEFECT_MARKER.to_string()],
        }
    }
}

impl RunConfig {
    /// Set the maximum number of attempts. Zero is raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    #[must_use]
    pub const fn with_improve_prompt(mut self, improve: bool) -> Self {
        self.improve_prompt = improve;
        self
    }

    /// Set the prompt augmentations. Blank entries are dropped and at most two are kept.
    #[must_use]
    pub fn with_prompt_augmentations<I, S>(mut self, augmentations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prompt_augmentations = augmentations
            .into_iter()
            .map(Into::into)
            .filter(|a| !a.trim().is_empty())
            .take(2)
            .collect();
        self
    }

    #[must_use]
    pub fn with_failure_retry_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.failure_retry_phrase = phrase.into();
        self
    }

    #[must_use]
    pub const fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    #[must_use]
    pub fn with_content_defect_markers(mut self, markers: Vec<String>) -> Self {
        self.content_defect_markers = markers;
        self
    }

    /// Effective attempt budget.
    #[must_use]
    pub fn attempt_budget(&self) -> usize {
        self.max_attempts.max(1)
    }
}
