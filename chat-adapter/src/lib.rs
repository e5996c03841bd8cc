//! Chat-model access through CLI coding agents.
//!
//! Each supported agent (Claude Code, Codex, OpenCode) is run once per
//! prompt in its non-interactive mode. The agent's stdout is the model's
//! reply.

/// Command-line argument construction per agent.
pub mod cmd;
/// Discovery of agent executables.
pub mod discovery;
/// Error types returned by adapter operations.
pub mod error;
/// Subprocess execution with bounded output and graceful shutdown.
pub mod process;
/// Shared data types for configuration and results.
pub mod types;

pub use discovery::discover_agent;
pub use error::ChatError;
pub use process::run_agent;
pub use types::*;

use std::path::PathBuf;
use tokio::process::Command;

/// A resolved CLI agent ready to answer prompts.
#[derive(Debug, Clone)]
pub struct AgentCli {
    /// Which agent this is.
    pub kind: AgentKind,
    /// Path to the agent executable.
    pub path: PathBuf,
}

impl AgentCli {
    #[must_use]
    pub const fn new(kind: AgentKind, path: PathBuf) -> Self {
        Self { kind, path }
    }

    /// Locates the executable for `kind` and wraps it.
    ///
    /// # Errors
    /// Returns `ChatError::ExecutableNotFound` when the agent is not installed.
    pub fn discover(kind: AgentKind, explicit_path: Option<PathBuf>) -> Result<Self, ChatError> {
        discover_agent(kind, explicit_path).map(|path| Self::new(kind, path))
    }

    /// Checks that the agent binary runs and answers `--version`.
    ///
    /// # Errors
    /// Returns an error if the binary cannot be executed or exits non-zero.
    pub async fn check_health(&self) -> Result<(), ChatError> {
        let output = Command::new(&self.path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| ChatError::SpawnFailed {
                stage: "health check".to_string(),
                source: e,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ChatError::NonZeroExit {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Sends one prompt and returns the agent's reply text.
    ///
    /// # Errors
    /// Returns `ChatError::NonZeroExit` if the agent fails, `ChatError::EmptyResponse`
    /// if it prints nothing, or any process-level error from [`run_agent`].
    pub async fn complete(&self, prompt: &str, config: &ChatConfig) -> Result<String, ChatError> {
        let args = cmd::build_args(self.kind, prompt, config);
        tracing::debug!(
            event = "chat_request",
            agent = %self.kind,
            prompt_chars = prompt.chars().count(),
            "chat_request"
        );

        let result = run_agent(&self.path, &args, config).await?;

        if result.exit_code != 0 {
            return Err(ChatError::NonZeroExit {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        let reply = result.stdout.trim();
        if reply.is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        tracing::debug!(
            event = "chat_response",
            agent = %self.kind,
            duration_ms = result.duration_ms,
            reply_chars = reply.chars().count(),
            "chat_response"
        );
        Ok(reply.to_string())
    }
}
