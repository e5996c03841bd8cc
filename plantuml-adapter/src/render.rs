//! Source-to-image rendering: write, invoke, then wait for the artifact.

use crate::cmd::build_args;
use crate::error::PlantUmlError;
use crate::process::run_plantuml;
use crate::types::{Launcher, RenderConfig, RenderOutput, ARTIFACT_NOT_FOUND, SOURCE_EXTENSION};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::time::sleep;

/// Renders `code` into `work_dir/<base_name>.<image-ext>`.
///
/// The source is written verbatim to `work_dir/<base_name>.uml`, replacing
/// any previous file of that name. A non-zero exit from the renderer yields a
/// failed [`RenderOutput`] carrying the trimmed error stream. A clean exit is
/// followed by polling for the image, since the file may land on disk after
/// the process has gone away.
///
/// An image left over from an earlier call with the same base name is not
/// removed first, so a clean exit can report that older file.
///
/// # Errors
///
/// Returns `PlantUmlError` only when the renderer cannot be run at all: the
/// base name is unusable, the source cannot be written, the process cannot be
/// spawned, or it exceeds the configured timeout.
pub async fn render(
    launcher: &Launcher,
    code: &str,
    work_dir: &Path,
    base_name: &str,
    config: &RenderConfig,
) -> Result<RenderOutput, PlantUmlError> {
    validate_base_name(base_name)?;

    let source_name = format!("{base_name}.{SOURCE_EXTENSION}");
    let source_path = work_dir.join(&source_name);
    tokio::fs::write(&source_path, code)
        .await
        .map_err(|e| PlantUmlError::WriteSource {
            path: source_path.clone(),
            source: e,
        })?;

    let args = build_args(launcher, OsStr::new(&source_name), config.image_format);
    tracing::debug!(
        event = "render_started",
        source = %source_path.display(),
        program = %launcher.program().display(),
        "render_started"
    );

    let process = run_plantuml(launcher.program(), &args, work_dir, config).await?;

    if process.exit_code != 0 {
        let stderr = process.stderr.trim();
        let diagnostic = if stderr.is_empty() {
            format!("renderer exited with status {}", process.exit_code)
        } else {
            stderr.to_string()
        };
        tracing::debug!(
            event = "render_rejected",
            exit_code = process.exit_code,
            duration_ms = process.duration_ms,
            "render_rejected"
        );
        return Ok(RenderOutput::rejected(diagnostic, &process));
    }

    let artifact = artifact_path(work_dir, base_name, config);
    if wait_for_artifact(&artifact, config).await {
        tracing::debug!(
            event = "render_succeeded",
            artifact = %artifact.display(),
            duration_ms = process.duration_ms,
            "render_succeeded"
        );
        Ok(RenderOutput::accepted(artifact, &process))
    } else {
        tracing::warn!(
            event = "render_artifact_missing",
            artifact = %artifact.display(),
            "render_artifact_missing"
        );
        Ok(RenderOutput::rejected(ARTIFACT_NOT_FOUND.to_string(), &process))
    }
}

/// Path of the image the renderer is expected to write for `base_name`.
#[must_use]
pub fn artifact_path(work_dir: &Path, base_name: &str, config: &RenderConfig) -> PathBuf {
    work_dir.join(format!("{base_name}.{}", config.image_format.extension()))
}

fn validate_base_name(base_name: &str) -> Result<(), PlantUmlError> {
    let bad = base_name.trim().is_empty()
        || base_name == "."
        || base_name == ".."
        || base_name.contains(['/', '\\']);
    if bad {
        return Err(PlantUmlError::InvalidBaseName(base_name.to_string()));
    }
    Ok(())
}

async fn wait_for_artifact(path: &Path, config: &RenderConfig) -> bool {
    for _ in 0..config.poll_attempts {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return true;
        }
        sleep(config.poll_interval).await;
    }
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_name() {
        assert!(validate_base_name("login-flow").is_ok());
        assert!(validate_base_name("").is_err());
        assert!(validate_base_name("  ").is_err());
        assert!(validate_base_name("..").is_err());
        assert!(validate_base_name("a/b").is_err());
        assert!(validate_base_name("a\\b").is_err());
    }

    #[test]
    fn test_artifact_path_uses_format_extension() {
        let config = RenderConfig {
            image_format: crate::types::ImageFormat::Svg,
            ..RenderConfig::default()
        };
        assert_eq!(
            artifact_path(Path::new("/out"), "seq", &config),
            PathBuf::from("/out/seq.svg")
        );
    }

    #[tokio::test]
    async fn test_wait_for_artifact_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            poll_attempts: 2,
            poll_interval: std::time::Duration::from_millis(5),
            ..RenderConfig::default()
        };
        assert!(!wait_for_artifact(&dir.path().join("missing.png"), &config).await);
    }
}
