//! End-to-end generation tests with a scripted chat agent and renderer.
//!
//! The agent answers with broken code until the prompt carries the retry
//! phrase, then with working code. The renderer rejects any source that
//! contains `BROKEN` with PlantUML's content-defect message.
#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use chat_adapter::{AgentCli, AgentKind, ChatConfig};
use plantgpt::backends::AgentChatModel;
use plantgpt::{generate, AppConfig, AppError, AppPaths, GenerateRequest, MethodologyLibrary, SchemeStore};
use plantuml_adapter::{Launcher, PlantUml};
use repair::{FailureKind, ProgressEvent, RunOutcome};
use tempfile::TempDir;

const FAKE_AGENT: &str = r#"#!/bin/sh
for last; do :; done
case "$last" in
  *ALWAYSBROKEN*) printf '```plantuml\n@startuml\nA -> B : BROKEN\n@enduml\n```\n' ;;
  *NOCODE*) echo "I would rather describe it in words." ;;
  *"contains errors"*) printf 'Fixed:\n```plantuml\n@startuml\nA -> B : fixed\n@enduml\n```\n' ;;
  *) printf 'Sure:\n```plantuml\n@startuml\nA -> B : BROKEN\n@enduml\n```\n' ;;
esac
"#;

const FAKE_PLANTUML: &str = r#"
for last in "$@"; do :; done
src="$last"
if grep -q BROKEN "$src"; then
  echo "Error line 2 in file: $src" >&2
  echo "Some diagram description contains errors" >&2
  exit 200
fi
cp "$src" "${src%.uml}.png"
"#;

static TOOLS: LazyLock<TempDir> = LazyLock::new(|| {
    let dir = tempfile::tempdir().unwrap();
    let agent = dir.path().join("fake-agent");
    std::fs::write(&agent, FAKE_AGENT).unwrap();
    std::fs::set_permissions(&agent, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::write(dir.path().join("fake-plantuml.sh"), FAKE_PLANTUML).unwrap();
    dir
});

fn model() -> Arc<AgentChatModel> {
    let agent = AgentCli::new(AgentKind::Claude, TOOLS.path().join("fake-agent"));
    Arc::new(AgentChatModel::new(agent, ChatConfig::default()))
}

fn plantuml() -> PlantUml {
    PlantUml::new(Launcher::Command {
        program: "sh".into(),
        leading_args: vec![OsString::from(TOOLS.path().join("fake-plantuml.sh"))],
    })
}

fn workspace() -> (TempDir, AppPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::at(dir.path().join("PlantGPT"));
    paths.ensure().unwrap();
    (dir, paths)
}

fn request(name: &str, prompt: &str) -> GenerateRequest {
    GenerateRequest {
        name: name.to_string(),
        prompt: prompt.to_string(),
        methodology: None,
    }
}

fn no_progress(_: &ProgressEvent) {}

#[tokio::test]
async fn test_defect_is_repaired_and_stored() {
    let (_dir, paths) = workspace();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();
    let mut events = Vec::new();

    let generation = generate(
        &request("login", "draw a login sequence"),
        &AppConfig::default(),
        &paths,
        model(),
        plantuml(),
        &store,
        |e: &ProgressEvent| events.push(e.clone()),
    )
    .await
    .unwrap();

    assert_eq!(generation.report.attempt_count(), 2);
    assert_eq!(
        generation.report.outcome,
        RunOutcome::Success {
            artifact_path: paths.images_dir.join("login.png"),
            diagram_source: "@startuml\nA -> B : fixed\n@enduml".to_string(),
        }
    );
    assert_eq!(generation.stored_image, Some(paths.images_dir.join("login.png")));

    let schemes = store.list().await.unwrap();
    assert_eq!(schemes.len(), 1);
    assert_eq!(schemes[0].name, "login");
    assert_eq!(schemes[0].code, "@startuml\nA -> B : fixed\n@enduml");

    assert!(matches!(events.first(), Some(ProgressEvent::Calling { attempt: 1, .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::Finished { attempts: 2, .. })));
}

#[tokio::test]
async fn test_export_after_clean_images_still_has_the_image() {
    let (dir, paths) = workspace();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();
    let generation = generate(
        &request("login", "draw a login sequence"),
        &AppConfig::default(),
        &paths,
        model(),
        plantuml(),
        &store,
        no_progress,
    )
    .await
    .unwrap();
    let image = generation.stored_image.unwrap();
    let rendered = std::fs::read(&image).unwrap();

    assert!(paths.clear_images().unwrap() >= 1);
    assert!(!image.exists());

    let id = store.get_by_name("login").await.unwrap().unwrap().id;
    let out = dir.path().join("export");
    let written = store.export(id, &out).await.unwrap();

    assert_eq!(written, vec![out.join("login.uml"), out.join("login.png")]);
    assert_eq!(std::fs::read(out.join("login.png")).unwrap(), rendered);
}

#[tokio::test]
async fn test_image_is_copied_from_custom_output_dir() {
    let (dir, paths) = workspace();
    let out = dir.path().join("renders");
    std::fs::create_dir(&out).unwrap();
    let mut config = AppConfig::default();
    config.set("output_dir", &out.display().to_string()).unwrap();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();

    let generation = generate(
        &request("flow", "draw a flow"),
        &config,
        &paths,
        model(),
        plantuml(),
        &store,
        no_progress,
    )
    .await
    .unwrap();

    let stored = paths.images_dir.join("flow.png");
    assert_eq!(generation.stored_image.as_ref(), Some(&stored));
    assert!(stored.is_file());
    assert!(out.join("flow.png").is_file());
    assert!(out.join("flow.uml").is_file());
}

#[tokio::test]
async fn test_exhausted_run_stores_nothing() {
    let (_dir, paths) = workspace();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();
    let mut config = AppConfig::default();
    config.set("max_retries", "2").unwrap();

    let generation = generate(
        &request("bad", "ALWAYSBROKEN diagram"),
        &config,
        &paths,
        model(),
        plantuml(),
        &store,
        no_progress,
    )
    .await
    .unwrap();

    match generation.report.outcome {
        RunOutcome::ExhaustedRetries {
            attempts,
            last_diagnostic,
        } => {
            assert_eq!(attempts, 2);
            assert!(last_diagnostic.contains("diagram description contains errors"));
        }
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
    assert!(generation.stored_image.is_none());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_without_code_is_fatal() {
    let (_dir, paths) = workspace();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();

    let generation = generate(
        &request("words", "NOCODE please"),
        &AppConfig::default(),
        &paths,
        model(),
        plantuml(),
        &store,
        no_progress,
    )
    .await
    .unwrap();

    assert!(matches!(
        generation.report.outcome,
        RunOutcome::FatalError {
            kind: FailureKind::NoCodeExtracted,
            ..
        }
    ));
    assert!(!paths.images_dir.join("words.uml").exists());
}

#[tokio::test]
async fn test_invalid_name_rejected_before_any_call() {
    let (_dir, paths) = workspace();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();

    let err = generate(
        &request("a/b", "draw"),
        &AppConfig::default(),
        &paths,
        model(),
        plantuml(),
        &store,
        no_progress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unknown_methodology_is_an_error() {
    let (_dir, paths) = workspace();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();
    let mut req = request("m", "draw");
    req.methodology = Some("Nonexistent".to_string());

    let err = generate(&req, &AppConfig::default(), &paths, model(), plantuml(), &store, no_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Methodology(_)));
}

#[tokio::test]
async fn test_methodology_reaches_the_prompt() {
    let (_dir, paths) = workspace();
    MethodologyLibrary::new(&paths.methodologies_dir)
        .save("Strict", "ALWAYSBROKEN marker travels with the methodology")
        .unwrap();
    let store = SchemeStore::open(paths.scheme_db()).unwrap();
    let mut config = AppConfig::default();
    config.set("max_retries", "1").unwrap();
    let mut req = request("m", "draw");
    req.methodology = Some("Strict".to_string());

    let generation = generate(&req, &config, &paths, model(), plantuml(), &store, no_progress)
        .await
        .unwrap();

    let first_prompt = &generation.report.attempts[0].prompt;
    assert!(first_prompt.starts_with("draw\n\nUse the following methodology"));
    assert!(matches!(
        generation.report.outcome,
        RunOutcome::ExhaustedRetries { attempts: 1, .. }
    ));
}

/// Requires Java, plantuml.jar and a logged-in Claude Code CLI.
#[tokio::test]
#[ignore = "Requires Java, PlantUML and Claude Code CLI"]
async fn e2e_generate_with_real_tools() {
    let (_dir, paths) = workspace();
    let config = AppConfig::default();
    let plantuml = plantgpt::backends::resolve_renderer(&config, &paths).unwrap();
    let model = Arc::new(plantgpt::backends::resolve_chat_model(&config, &paths).unwrap());
    let store = SchemeStore::open(paths.scheme_db()).unwrap();

    let generation = generate(
        &request("login", "draw a login sequence between a user, a web app and an auth server"),
        &config,
        &paths,
        model,
        plantuml,
        &store,
        no_progress,
    )
    .await
    .unwrap();

    let image: PathBuf = generation.stored_image.expect("diagram should render");
    assert!(image.is_file());
}
