//! Progress events emitted while a run moves through its states.

use crate::outcome::RunOutcome;
use crate::types::FailureKind;
use serde::{Deserialize, Serialize};

/// State-machine transition observed by a progress listener.
///
/// Events are informational. Dropping the receiver never changes the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A chat call is about to be made.
    Calling { attempt: usize, max_attempts: usize },
    /// The reply arrived and code extraction starts.
    Extracting { attempt: usize },
    /// Code was found and is being rendered.
    Rendering { attempt: usize },
    /// The renderer rejected the code and the failure is being classified.
    Classifying {
        attempt: usize,
        diagnostic: String,
    },
    /// The prompt is being rewritten for the next attempt.
    Mutating { attempt: usize, kind: FailureKind },
    /// The run reached a terminal state.
    Finished { attempts: usize, outcome: RunOutcome },
}

impl ProgressEvent {
    /// Attempt number the event belongs to (total attempts for `Finished`).
    #[must_use]
    pub const fn attempt(&self) -> usize {
        match self {
            Self::Calling { attempt, .. }
            | Self::Extracting { attempt }
            | Self::Rendering { attempt }
            | Self::Classifying { attempt, .. }
            | Self::Mutating { attempt, .. } => *attempt,
            Self::Finished { attempts, .. } => *attempts,
        }
    }
}
