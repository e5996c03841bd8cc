//! Tests for `AgentCli::complete` against a scripted stand-in agent.
//!
//! The stand-in looks at its last argument (the prompt) to decide how to
//! behave, so a single script serves every test in this binary.

#![cfg(unix)]

use chat_adapter::{AgentCli, AgentKind, ChatConfig, ChatError};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::LazyLock;
use tempfile::TempDir;

const FAKE_AGENT: &str = r#"#!/bin/sh
for last; do :; done
case "$last" in
  fail) echo "quota exceeded" >&2; exit 2 ;;
  silent) exit 0 ;;
  blank) printf '\n   \n' ; exit 0 ;;
  *) echo "first-arg=$1"; echo "reply to: $last" ;;
esac
"#;

static AGENT_DIR: LazyLock<TempDir> = LazyLock::new(|| {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake-agent");
    std::fs::write(&path, FAKE_AGENT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    dir
});

fn fake_agent(kind: AgentKind) -> AgentCli {
    let path: PathBuf = AGENT_DIR.path().join("fake-agent");
    AgentCli::new(kind, path)
}

#[tokio::test]
async fn test_complete_returns_trimmed_stdout() {
    let agent = fake_agent(AgentKind::Claude);
    let reply = agent.complete("draw a class diagram", &ChatConfig::default()).await.unwrap();

    assert_eq!(reply, "first-arg=--print\nreply to: draw a class diagram");
}

#[tokio::test]
async fn test_codex_invocation_starts_with_exec() {
    let agent = fake_agent(AgentKind::Codex);
    let reply = agent.complete("hello", &ChatConfig::default()).await.unwrap();

    assert!(reply.starts_with("first-arg=exec"), "got {reply}");
}

#[tokio::test]
async fn test_agent_failure_surfaces_stderr() {
    let agent = fake_agent(AgentKind::OpenCode);
    let err = agent.complete("fail", &ChatConfig::default()).await.unwrap_err();

    match err {
        ChatError::NonZeroExit { exit_code, stderr } => {
            assert_eq!(exit_code, 2);
            assert_eq!(stderr, "quota exceeded");
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_reply_is_an_error() {
    let agent = fake_agent(AgentKind::Claude);

    for prompt in ["silent", "blank"] {
        let err = agent.complete(prompt, &ChatConfig::default()).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse), "{prompt}: {err:?}");
    }
}

#[tokio::test]
async fn test_discover_missing_explicit_path() {
    let err = AgentCli::discover(AgentKind::Codex, Some(PathBuf::from("/nonexistent/codex")))
        .unwrap_err();
    assert!(matches!(err, ChatError::ExecutableNotFound(_)));
}

/// Requires a logged-in Claude Code CLI.
#[tokio::test]
#[ignore = "Requires Claude Code CLI installed and authenticated"]
async fn e2e_claude_answers_with_plantuml() {
    let agent = AgentCli::discover(AgentKind::Claude, None).expect("claude not installed");
    let reply = agent
        .complete(
            "Reply with a minimal PlantUML sequence diagram between Alice and Bob.",
            &ChatConfig::default(),
        )
        .await
        .unwrap();

    assert!(reply.contains("@startuml"), "reply was: {reply}");
}
