use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlantUmlError {
    #[error("Java runtime not found: {0}")]
    JavaNotFound(String),

    #[error("PlantUML not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid diagram base name: {0:?}")]
    InvalidBaseName(String),

    #[error("Failed to write diagram source {}: {source}", path.display())]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Renderer timed out after {0:?}")]
    Timeout(std::time::Duration),
}
