//! Rust adapter for driving PlantUML as a subprocess.
//!
//! This crate provides discovery of the Java runtime and `plantuml.jar`,
//! argument construction, and a render call that writes diagram source,
//! runs the renderer, and resolves the produced image.

/// Command-line argument construction for PlantUML invocations.
pub mod cmd;
/// Discovery and resolution of Java and the PlantUML renderer.
pub mod discovery;
/// Error types returned by adapter operations.
pub mod error;
/// Subprocess execution with timeout handling.
pub mod process;
/// Source writing, renderer invocation and artifact polling.
pub mod render;
/// Shared data types for configuration and results.
pub mod types;

pub use discovery::{discover_java, discover_jar, discover_plantuml};
pub use error::PlantUmlError;
pub use render::{artifact_path, render};
pub use types::*;

use std::path::{Path, PathBuf};

/// High-level handle on a resolved PlantUML renderer.
#[derive(Debug, Clone)]
pub struct PlantUml {
    /// How the renderer is launched.
    pub launcher: Launcher,
}

impl PlantUml {
    /// Creates a handle from an already-resolved launcher.
    #[must_use]
    pub const fn new(launcher: Launcher) -> Self {
        Self { launcher }
    }

    /// Discovers the renderer, preferring an explicit jar and Java runtime.
    ///
    /// # Errors
    ///
    /// Returns `PlantUmlError` if no usable renderer can be located.
    pub fn discover(
        explicit_jar: Option<PathBuf>,
        explicit_java: Option<PathBuf>,
    ) -> Result<Self, PlantUmlError> {
        discover_plantuml(explicit_jar, explicit_java).map(Self::new)
    }

    /// Renders `code` into `work_dir/<base_name>.<image-ext>`.
    ///
    /// # Errors
    ///
    /// Returns `PlantUmlError` if the renderer cannot be run at all. A
    /// rejected diagram is reported through [`RenderOutput::succeeded`].
    pub async fn render(
        &self,
        code: &str,
        work_dir: &Path,
        base_name: &str,
        config: &RenderConfig,
    ) -> Result<RenderOutput, PlantUmlError> {
        render::render(&self.launcher, code, work_dir, base_name, config).await
    }

    /// Runs `-version` and returns the first line of output.
    ///
    /// # Errors
    ///
    /// Returns `PlantUmlError` if the renderer cannot be spawned or times out.
    pub async fn version(&self, config: &RenderConfig) -> Result<String, PlantUmlError> {
        let args = cmd::build_version_args(&self.launcher);
        let cwd = std::env::temp_dir();
        let output = process::run_plantuml(self.launcher.program(), &args, &cwd, config).await?;
        let text = if output.stdout.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}
