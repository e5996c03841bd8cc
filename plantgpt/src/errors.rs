use thiserror::Error;

use crate::download::DownloadError;
use crate::methodology::MethodologyError;
use crate::store::StoreError;

/// Errors relating to the PlantGPT application layer.
#[derive(Debug, Error)]
pub enum AppError {
    /// Error from the PlantUML adapter.
    #[error("PlantUML error: {0}")]
    PlantUml(#[from] plantuml_adapter::PlantUmlError),

    /// Error from the chat agent adapter.
    #[error("Chat agent error: {0}")]
    Chat(#[from] chat_adapter::ChatError),

    /// Scheme store error.
    #[error("Scheme store error: {0}")]
    Store(#[from] StoreError),

    /// PlantUML jar download error.
    #[error("PlantUML download error: {0}")]
    Download(#[from] DownloadError),

    /// Methodology library error.
    #[error("Methodology error: {0}")]
    Methodology(#[from] MethodologyError),

    /// A generation request failed validation before any work started.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker task failed to complete.
    #[error("Generation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
