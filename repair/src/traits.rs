//! Seams between the loop and the outside world.

use crate::error::BackendError;
use crate::types::RenderResult;
use async_trait::async_trait;

/// A chat model that answers one prompt with one reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends `prompt` and returns the reply text.
    ///
    /// # Errors
    /// Returns `BackendError::Chat` on transport or provider failure.
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

/// A renderer bound to an output location.
///
/// Rendering the same code twice must overwrite the previous source and
/// artifact and report the same artifact path.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Renders `code`.
    ///
    /// # Errors
    /// Returns `BackendError::Tooling` only when the tool could not be run.
    /// A rejected diagram is an `Ok` result with `succeeded == false`.
    async fn render(&self, code: &str) -> Result<RenderResult, BackendError>;
}
