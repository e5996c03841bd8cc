//! Adapters that plug the CLI agent and PlantUML into the repair loop.

use std::path::PathBuf;

use async_trait::async_trait;
use chat_adapter::{AgentCli, ChatConfig};
use plantuml_adapter::{PlantUml, RenderConfig, RenderOutput};
use repair::{BackendError, ChatModel, DiagramRenderer, RenderResult};

use crate::config::{AppConfig, AppPaths};
use crate::errors::AppError;

/// Chat model backed by a CLI coding agent.
#[derive(Debug, Clone)]
pub struct AgentChatModel {
    agent: AgentCli,
    config: ChatConfig,
}

impl AgentChatModel {
    #[must_use]
    pub const fn new(agent: AgentCli, config: ChatConfig) -> Self {
        Self { agent, config }
    }
}

#[async_trait]
impl ChatModel for AgentChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.agent
            .complete(prompt, &self.config)
            .await
            .map_err(|e| BackendError::Chat(e.to_string()))
    }
}

/// PlantUML bound to one output directory and file name.
#[derive(Debug, Clone)]
pub struct PlantUmlRenderer {
    plantuml: PlantUml,
    work_dir: PathBuf,
    base_name: String,
    config: RenderConfig,
}

impl PlantUmlRenderer {
    #[must_use]
    pub fn new(
        plantuml: PlantUml,
        work_dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        config: RenderConfig,
    ) -> Self {
        Self {
            plantuml,
            work_dir: work_dir.into(),
            base_name: base_name.into(),
            config,
        }
    }
}

#[async_trait]
impl DiagramRenderer for PlantUmlRenderer {
    async fn render(&self, code: &str) -> Result<RenderResult, BackendError> {
        self.plantuml
            .render(code, &self.work_dir, &self.base_name, &self.config)
            .await
            .map(to_render_result)
            .map_err(|e| BackendError::Tooling(e.to_string()))
    }
}

fn to_render_result(output: RenderOutput) -> RenderResult {
    RenderResult {
        succeeded: output.succeeded,
        artifact_path: output.artifact_path,
        diagnostic_text: output.diagnostic,
    }
}

/// Locates PlantUML using the configured jar and Java runtime.
///
/// # Errors
/// Returns `AppError::PlantUml` when no renderer can be found.
pub fn resolve_renderer(config: &AppConfig, paths: &AppPaths) -> Result<PlantUml, AppError> {
    Ok(PlantUml::discover(config.jar(paths), config.java_path.clone())?)
}

/// Locates the configured chat agent.
///
/// # Errors
/// Returns `AppError::Chat` when the agent executable cannot be found.
pub fn resolve_chat_model(config: &AppConfig, paths: &AppPaths) -> Result<AgentChatModel, AppError> {
    let agent = AgentCli::discover(config.backend, None)?;
    tracing::debug!(
        event = "agent_resolved",
        agent = %agent.kind,
        path = %agent.path.display(),
        "agent_resolved"
    );
    Ok(AgentChatModel::new(agent, config.chat_config(Some(paths.root.clone()))))
}
