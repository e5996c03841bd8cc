//! Shared data types for PlantUML adapter configuration and results.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File extension used for the diagram source written before each render.
pub const SOURCE_EXTENSION: &str = "uml";

/// Diagnostic reported when the renderer exits cleanly but no image appears.
pub const ARTIFACT_NOT_FOUND: &str = "artifact not found after render";

/// Image format requested from PlantUML.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raster PNG output (PlantUML default).
    #[default]
    Png,
    /// Vector SVG output (`-tsvg`).
    Svg,
}

impl ImageFormat {
    /// File extension PlantUML writes for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    /// Command-line flag selecting this format, if it is not the default.
    #[must_use]
    pub const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Png => None,
            Self::Svg => Some("-tsvg"),
        }
    }

    /// Parses a format name (`png` or `svg`, case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }
}

/// How the PlantUML renderer is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// `java -jar plantuml.jar ...`
    Jar {
        /// Java runtime executable.
        java: PathBuf,
        /// Path to `plantuml.jar`.
        jar: PathBuf,
    },
    /// A standalone program (e.g. the distro `plantuml` wrapper script),
    /// optionally preceded by fixed leading arguments.
    Command {
        /// Executable to spawn.
        program: PathBuf,
        /// Arguments placed before the PlantUML flags.
        leading_args: Vec<OsString>,
    },
}

impl Launcher {
    /// The executable spawned for this launcher.
    #[must_use]
    pub fn program(&self) -> &Path {
        match self {
            Self::Jar { java, .. } => java,
            Self::Command { program, .. } => program,
        }
    }
}

/// Configuration for a single render invocation.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output image format.
    pub image_format: ImageFormat,
    /// Maximum wall-clock duration before the renderer is killed.
    pub timeout: Duration,
    /// How many times to look for the image after a clean exit.
    pub poll_attempts: u32,
    /// Pause between two looks for the image.
    pub poll_interval: Duration,
    /// Extra environment variables passed to the subprocess.
    pub env: Vec<(String, String)>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_format: ImageFormat::Png,
            timeout: Duration::from_secs(120),
            poll_attempts: 20,
            poll_interval: Duration::from_millis(100),
            env: Vec::new(),
        }
    }
}

/// Raw outcome of a finished renderer subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code (`-1` if the process was killed by a signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Interpreted outcome of one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Whether the renderer accepted the source and produced an image.
    pub succeeded: bool,
    /// Image written by the renderer (set on success).
    pub artifact_path: Option<PathBuf>,
    /// Trimmed error stream, or [`ARTIFACT_NOT_FOUND`] (set on failure).
    pub diagnostic: Option<String>,
    /// Process exit code.
    pub exit_code: i32,
    /// Wall-clock duration of the subprocess in milliseconds.
    pub duration_ms: u64,
}

impl RenderOutput {
    pub(crate) fn accepted(artifact: PathBuf, process: &ProcessOutput) -> Self {
        Self {
            succeeded: true,
            artifact_path: Some(artifact),
            diagnostic: None,
            exit_code: process.exit_code,
            duration_ms: process.duration_ms,
        }
    }

    pub(crate) fn rejected(diagnostic: String, process: &ProcessOutput) -> Self {
        Self {
            succeeded: false,
            artifact_path: None,
            diagnostic: Some(diagnostic),
            exit_code: process.exit_code,
            duration_ms: process.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_parse() {
        assert_eq!(ImageFormat::parse("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse(" svg "), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::parse("gif"), None);
    }

    #[test]
    fn test_image_format_flags() {
        assert_eq!(ImageFormat::Png.flag(), None);
        assert_eq!(ImageFormat::Svg.flag(), Some("-tsvg"));
        assert_eq!(ImageFormat::Svg.extension(), "svg");
    }

    #[test]
    fn test_render_config_default() {
        let config = RenderConfig::default();
        assert_eq!(config.poll_attempts, 20);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.image_format, ImageFormat::Png);
    }
}
