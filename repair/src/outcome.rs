//! Terminal results of a repair run.

use crate::metrics::RunMetrics;
use crate::types::{Attempt, FailureKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The renderer accepted the code.
    Success {
        /// Image produced by the renderer.
        artifact_path: PathBuf,
        /// Code extracted on the successful attempt.
        diagram_source: String,
    },
    /// Every attempt ended in a content defect.
    ExhaustedRetries {
        /// Number of attempts made (equals the budget).
        attempts: usize,
        /// Renderer output from the final attempt.
        last_diagnostic: String,
    },
    /// A failure that no further attempt can fix.
    FatalError {
        /// Category of the failure.
        kind: FailureKind,
        /// Raw explanation, surfaced to the user verbatim.
        message: String,
    },
}

impl RunOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { artifact_path, .. } => {
                write!(f, "diagram rendered to {}", artifact_path.display())
            }
            Self::ExhaustedRetries {
                attempts,
                last_diagnostic,
            } => write!(
                f,
                "diagram still invalid after {attempts} attempts: {last_diagnostic}"
            ),
            Self::FatalError { kind, message } => write!(f, "{kind}: {message}"),
        }
    }
}

/// Everything `run()` knows when it returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier, also recorded on the run's tracing span.
    pub run_id: String,
    /// Terminal state.
    pub outcome: RunOutcome,
    /// Attempt records, indexed contiguously from 1.
    pub attempts: Vec<Attempt>,
    /// Counters and timing.
    pub metrics: RunMetrics,
}

impl RunReport {
    /// Number of attempts made.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}
