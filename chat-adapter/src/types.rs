use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// CLI coding agent used as the chat model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Claude Code (`claude --print`).
    #[default]
    Claude,
    /// OpenAI Codex (`codex exec`).
    Codex,
    /// OpenCode (`opencode run`).
    OpenCode,
}

impl AgentKind {
    /// Name of the executable looked up on `$PATH`.
    #[must_use]
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::OpenCode => "opencode",
        }
    }

    /// Environment variable that overrides the executable location.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Claude => "PLANTGPT_CLAUDE_BIN",
            Self::Codex => "PLANTGPT_CODEX_BIN",
            Self::OpenCode => "PLANTGPT_OPENCODE_BIN",
        }
    }

    /// Install hint shown when the executable cannot be found.
    #[must_use]
    pub const fn install_hint(self) -> &'static str {
        match self {
            Self::Claude => "npm i -g @anthropic-ai/claude-code",
            Self::Codex => "npm i -g @openai/codex",
            Self::OpenCode => "go install github.com/opencode-ai/opencode@latest",
        }
    }

    /// Parses an agent name (`claude`, `codex`, `opencode`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "claude-code" | "claudecode" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "opencode" => Some(Self::OpenCode),
            _ => None,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model name override passed through `--model`.
    pub model: Option<String>,
    /// Extra system instructions (Claude only, `--append-system-prompt`).
    pub system_prompt: Option<String>,
    /// Maximum wall-clock duration before the process is terminated.
    pub timeout: Duration,
    /// Working directory for the subprocess.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables passed to the subprocess.
    pub env: Vec<(String, String)>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: None,
            system_prompt: None,
            timeout: Duration::from_secs(300),
            cwd: None,
            env: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}
