use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat agent executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Failed to spawn agent at stage '{stage}': {source}")]
    SpawnFailed {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read agent output at stage '{stage}': {source}")]
    StreamFailed {
        stage: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Agent output exceeded {limit_bytes} bytes (captured {captured_bytes})")]
    OutputTruncated {
        captured_bytes: usize,
        limit_bytes: usize,
    },

    #[error("Agent timed out after {elapsed:?} (pid {pid})")]
    Timeout {
        elapsed: std::time::Duration,
        pid: u32,
    },

    #[error("Failed to send {signal} to pid {pid}: {reason}")]
    SignalFailed {
        signal: String,
        pid: u32,
        reason: String,
    },

    #[error("Agent exited with non-zero status: {exit_code}\nSTDERR: {stderr}")]
    NonZeroExit { exit_code: i32, stderr: String },

    #[error("Agent returned an empty response")]
    EmptyResponse,

    #[error("Agent process has no {0} handle")]
    MissingHandle(&'static str),
}
