//! Command-line argument builder for chat-only agent invocations.
//!
//! Every agent is driven in its one-shot, non-interactive mode and kept away
//! from the filesystem where the CLI allows it:
//!
//! | agent | invocation | containment |
//! |-------|------------|-------------|
//! | Claude Code | `claude --print --output-format text` | `--tools ""` disables built-in tools |
//! | Codex | `codex exec` | `--sandbox read-only --skip-git-repo-check` |
//! | OpenCode | `opencode run` | none available |

use crate::types::{AgentKind, ChatConfig};
use std::ffi::OsString;

/// Builds the argument list for sending `prompt` to `kind`.
#[must_use]
pub fn build_args(kind: AgentKind, prompt: &str, config: &ChatConfig) -> Vec<OsString> {
    let mut args = Vec::new();

    match kind {
        AgentKind::Claude => {
            args.push(OsString::from("--print"));
            args.push(OsString::from("--output-format"));
            args.push(OsString::from("text"));
            args.push(OsString::from("--tools"));
            args.push(OsString::from(""));
        }
        AgentKind::Codex => {
            args.push(OsString::from("exec"));
            args.push(OsString::from("--sandbox"));
            args.push(OsString::from("read-only"));
            args.push(OsString::from("--skip-git-repo-check"));
        }
        AgentKind::OpenCode => {
            args.push(OsString::from("run"));
        }
    }

    if let Some(ref model) = config.model {
        args.push(OsString::from("--model"));
        args.push(OsString::from(model));
    }

    if let (AgentKind::Claude, Some(system)) = (kind, &config.system_prompt) {
        args.push(OsString::from("--append-system-prompt"));
        args.push(OsString::from(system));
    }

    args.push(OsString::from(prompt));

    args
}
