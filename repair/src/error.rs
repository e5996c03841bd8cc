use thiserror::Error;

/// Failure of a collaborator to run at all.
///
/// A rejected diagram is not an error: renderers report it through
/// [`RenderResult`](crate::RenderResult). These variants are for the cases
/// where no verdict could be obtained.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The chat model could not produce a reply (missing agent, non-zero exit, timeout).
    #[error("Chat model failed: {0}")]
    Chat(String),

    /// The renderer could not be run (missing tool, spawn failure, I/O, timeout).
    #[error("Renderer failed: {0}")]
    Tooling(String),
}
