//! One generation request: validation, the repair run, and storing the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plantuml_adapter::PlantUml;
use repair::{assemble, ChatModel, ProgressEvent, RepairOrchestrator, RunOutcome, RunReport};

use crate::backends::PlantUmlRenderer;
use crate::config::{AppConfig, AppPaths};
use crate::errors::AppError;
use crate::methodology::MethodologyLibrary;
use crate::store::ArtifactSink;

/// Characters that may not appear in a scheme file name.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// File name (without extension) for the source and image.
    pub name: String,
    /// Natural-language description of the diagram.
    pub prompt: String,
    /// Methodology to apply, by name.
    pub methodology: Option<String>,
}

/// Result of a finished generation.
#[derive(Debug)]
pub struct Generation {
    /// Full report of the repair run.
    pub report: RunReport,
    /// Copy of the image in the images directory, set on success.
    pub stored_image: Option<PathBuf>,
}

/// Checks a request before any model or renderer is involved.
///
/// # Errors
/// Returns `AppError::InvalidRequest` describing the first problem found.
pub fn validate_request(request: &GenerateRequest, output_dir: &Path) -> Result<(), AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::InvalidRequest("Prompt is empty".to_string()));
    }
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Scheme name is empty".to_string()));
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(AppError::InvalidRequest(format!(
            "Scheme name '{name}' contains one of {}",
            FORBIDDEN_NAME_CHARS.iter().collect::<String>()
        )));
    }
    if !output_dir.is_dir() {
        return Err(AppError::InvalidRequest(format!(
            "Output directory does not exist: {}",
            output_dir.display()
        )));
    }
    Ok(())
}

/// Runs one generation end to end.
///
/// The repair loop runs on its own task while this task drains progress
/// events into `on_progress`. On success the image is copied to
/// `Images/<name>.<ext>` and recorded in `sink`.
///
/// # Errors
/// Returns an error for an invalid request, an unknown methodology, a
/// failed worker task, or a failure to copy or store the result. A run that
/// ends without a diagram is not an error: see [`Generation::report`].
pub async fn generate<S, F>(
    request: &GenerateRequest,
    config: &AppConfig,
    paths: &AppPaths,
    model: Arc<dyn ChatModel>,
    plantuml: PlantUml,
    sink: &S,
    mut on_progress: F,
) -> Result<Generation, AppError>
where
    S: ArtifactSink + ?Sized,
    F: FnMut(&ProgressEvent),
{
    let output_dir = config.output_dir(paths);
    validate_request(request, &output_dir)?;
    let name = request.name.trim().to_string();

    let methodology = match request.methodology.as_deref() {
        Some(m) => Some(MethodologyLibrary::new(&paths.methodologies_dir).load(m)?),
        None => None,
    };

    let run_config = config.run_config();
    let initial_prompt = assemble(request.prompt.trim(), methodology.as_deref(), &run_config);
    let renderer = PlantUmlRenderer::new(plantuml, &output_dir, &name, config.render_config());

    tracing::info!(
        event = "generation_started",
        name = %name,
        max_attempts = run_config.max_attempts,
        improve_prompt = run_config.improve_prompt,
        "generation_started"
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = RepairOrchestrator::with_config(model, Arc::new(renderer), run_config)
        .with_progress(tx)
        .spawn(initial_prompt);

    while let Some(event) = rx.recv().await {
        on_progress(&event);
    }
    let report = handle.await?;

    let stored_image = match &report.outcome {
        RunOutcome::Success {
            artifact_path,
            diagram_source,
        } => {
            let image = copy_to_images(artifact_path, &name, config, paths).await?;
            sink.store(&name, diagram_source, &image).await?;
            Some(image)
        }
        _ => None,
    };

    Ok(Generation {
        report,
        stored_image,
    })
}

async fn copy_to_images(
    artifact: &Path,
    name: &str,
    config: &AppConfig,
    paths: &AppPaths,
) -> Result<PathBuf, AppError> {
    let extension = artifact
        .extension()
        .map_or_else(|| config.image_format.extension().to_string(), |e| e.to_string_lossy().into_owned());
    let destination = paths.images_dir.join(format!("{name}.{extension}"));

    if destination != artifact {
        tokio::fs::create_dir_all(&paths.images_dir).await?;
        tokio::fs::copy(artifact, &destination).await?;
    }
    Ok(destination)
}
