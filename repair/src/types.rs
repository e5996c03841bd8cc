//! Records exchanged between the loop and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What the renderer reported for one piece of diagram source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    /// Whether the renderer accepted the source and produced an artifact.
    pub succeeded: bool,
    /// Produced artifact, present only on success.
    pub artifact_path: Option<PathBuf>,
    /// Renderer error output, present only on failure.
    pub diagnostic_text: Option<String>,
}

impl RenderResult {
    #[must_use]
    pub fn success(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            succeeded: true,
            artifact_path: Some(artifact_path.into()),
            diagnostic_text: None,
        }
    }

    #[must_use]
    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            artifact_path: None,
            diagnostic_text: Some(diagnostic.into()),
        }
    }
}

/// Why an attempt did not produce a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The model answered without any recognizable diagram source.
    NoCodeExtracted,
    /// The renderer rejected the diagram content; worth asking the model again.
    RetryableRenderDefect,
    /// The renderer failed for some other reason.
    FatalRenderDefect,
    /// The chat model or the renderer could not be run at all.
    FatalToolingError,
}

impl FailureKind {
    /// Whether another attempt may follow this failure.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RetryableRenderDefect)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoCodeExtracted => "no code extracted",
            Self::RetryableRenderDefect => "diagram content defect",
            Self::FatalRenderDefect => "renderer failure",
            Self::FatalToolingError => "tooling error",
        };
        f.write_str(s)
    }
}

/// One call-extract-render-classify iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based attempt number.
    pub index: usize,
    /// Prompt sent to the model.
    pub prompt: String,
    /// Model reply, absent if the chat call failed.
    pub model_response: Option<String>,
    /// Code pulled out of the reply.
    pub extracted_code: Option<String>,
    /// Renderer verdict, absent if rendering never happened.
    pub render_result: Option<RenderResult>,
}

impl Attempt {
    pub(crate) const fn new(index: usize, prompt: String) -> Self {
        Self {
            index,
            prompt,
            model_response: None,
            extracted_code: None,
            render_result: None,
        }
    }
}
