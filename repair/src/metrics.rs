//! Metrics tracking and token estimation for repair runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics collected during a repair run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Total number of attempts made.
    pub total_attempts: usize,
    /// Wall-clock time elapsed during the run.
    pub wall_time: Duration,
    /// Estimated input tokens sent to the model, summed over attempts.
    pub estimated_input_tokens: usize,
    /// Estimated output tokens received from the model, summed over attempts.
    pub estimated_output_tokens: usize,
}

/// Estimate token count from text using the standard 4-chars-per-token heuristic.
///
/// Counts `chars()`, not bytes, and rounds up.
///
/// ```
/// use repair::estimate_tokens;
///
/// assert_eq!(estimate_tokens("hello"), 2);
/// assert_eq!(estimate_tokens("hello world"), 3);
/// ```
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
