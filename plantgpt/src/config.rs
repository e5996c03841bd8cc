//! Application directories and the persisted user configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_adapter::{AgentKind, ChatConfig};
use plantuml_adapter::{ImageFormat, RenderConfig};
use repair::RunConfig;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

/// Environment variable overriding the application root (default `~/PlantGPT`).
pub const HOME_ENV: &str = "PLANTGPT_HOME";
/// Attempt budget used when none (or an invalid one) is configured.
pub const DEFAULT_MAX_RETRIES: usize = 5;

const APP_DIR_NAME: &str = "PlantGPT";

/// Filesystem layout under the application root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Application root.
    pub root: PathBuf,
    /// Scheme database directory.
    pub db_dir: PathBuf,
    /// Stored diagram images.
    pub images_dir: PathBuf,
    /// Methodology text files.
    pub methodologies_dir: PathBuf,
    /// Default location of `plantuml.jar`.
    pub plantuml_dir: PathBuf,
    /// `config.json`.
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Lays out the directories under `root`.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            db_dir: root.join("DB"),
            images_dir: root.join("Images"),
            methodologies_dir: root.join("Methodologies"),
            plantuml_dir: root.join("PlantUML"),
            config_file: root.join("config.json"),
            root,
        }
    }

    /// Resolves the root from `PLANTGPT_HOME`, falling back to `~/PlantGPT`.
    ///
    /// # Errors
    /// Returns `AppError::Config` if neither is available.
    pub fn resolve() -> Result<Self, AppError> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(root));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Could not determine home directory".to_string()))?;
        Ok(Self::at(home.join(APP_DIR_NAME)))
    }

    /// Creates every directory of the layout.
    ///
    /// # Errors
    /// Returns the first I/O error encountered.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            &self.root,
            &self.db_dir,
            &self.images_dir,
            &self.methodologies_dir,
            &self.plantuml_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn default_jar(&self) -> PathBuf {
        self.plantuml_dir.join("plantuml.jar")
    }

    #[must_use]
    pub fn scheme_db(&self) -> PathBuf {
        self.db_dir.join("plantuml_schemes.db")
    }

    /// Deletes every regular file in the images directory.
    ///
    /// # Errors
    /// Returns an I/O error if the directory cannot be read or a file cannot be removed.
    pub fn clear_images(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.images_dir)? {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// User configuration persisted as JSON.
///
/// Every field is optional in the file. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Explicit `plantuml.jar`.
    #[serde(deserialize_with = "blank_as_none")]
    pub jar_path: Option<PathBuf>,
    /// Explicit Java runtime.
    #[serde(deserialize_with = "blank_as_none")]
    pub java_path: Option<PathBuf>,
    /// Directory the renderer writes into (default: the images directory).
    #[serde(deserialize_with = "blank_as_none")]
    pub output_dir: Option<PathBuf>,
    /// Wrap prompts in the invent-then-diagram template.
    pub improve_prompt: bool,
    /// Attempt budget per generation.
    #[serde(deserialize_with = "lenient_max_retries")]
    pub max_retries: usize,
    /// First extra instruction used with `improve_prompt`.
    pub prompt_improve_1: String,
    /// Second extra instruction used with `improve_prompt`.
    pub prompt_improve_2: String,
    /// CLI agent answering prompts.
    pub backend: AgentKind,
    /// Model override passed to the agent.
    pub model: Option<String>,
    /// Chat call timeout in seconds.
    pub chat_timeout_secs: u64,
    /// Renderer timeout in seconds.
    pub render_timeout_secs: u64,
    /// Image format requested from the renderer.
    pub image_format: ImageFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jar_path: None,
            java_path: None,
            output_dir: None,
            improve_prompt: false,
            max_retries: DEFAULT_MAX_RETRIES,
            prompt_improve_1: String::new(),
            prompt_improve_2: String::new(),
            backend: AgentKind::default(),
            model: None,
            chat_timeout_secs: 300,
            render_timeout_secs: 120,
            image_format: ImageFormat::default(),
        }
    }
}

/// Keys accepted by [`AppConfig::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "jar_path",
    "java_path",
    "output_dir",
    "improve_prompt",
    "max_retries",
    "prompt_improve_1",
    "prompt_improve_2",
    "backend",
    "model",
    "chat_timeout_secs",
    "render_timeout_secs",
    "image_format",
];

impl AppConfig {
    /// Reads the configuration at `path`.
    ///
    /// A missing, unreadable or malformed file yields the defaults.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(event = "config_unreadable", path = %path.display(), error = %e, "config_unreadable");
                return Self::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(event = "config_invalid", path = %path.display(), error = %e, "config_invalid");
            Self::default()
        })
    }

    /// Writes the configuration to `path` as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Updates one field from its textual form. An empty value clears optional fields.
    ///
    /// # Errors
    /// Returns `AppError::Config` for an unknown key or an unparsable value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        let optional_path = || (!value.is_empty()).then(|| PathBuf::from(value));

        match key {
            "jar_path" => self.jar_path = optional_path(),
            "java_path" => self.java_path = optional_path(),
            "output_dir" => self.output_dir = optional_path(),
            "improve_prompt" => self.improve_prompt = parse_bool(value)?,
            "max_retries" => {
                self.max_retries = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| invalid(key, value, "a positive integer"))?;
            }
            "prompt_improve_1" => self.prompt_improve_1 = value.to_string(),
            "prompt_improve_2" => self.prompt_improve_2 = value.to_string(),
            "backend" => {
                self.backend = AgentKind::parse(value)
                    .ok_or_else(|| invalid(key, value, "claude, codex or opencode"))?;
            }
            "model" => self.model = (!value.is_empty()).then(|| value.to_string()),
            "chat_timeout_secs" => self.chat_timeout_secs = parse_secs(key, value)?,
            "render_timeout_secs" => self.render_timeout_secs = parse_secs(key, value)?,
            "image_format" => {
                self.image_format =
                    ImageFormat::parse(value).ok_or_else(|| invalid(key, value, "png or svg"))?;
            }
            _ => {
                return Err(AppError::Config(format!(
                    "Unknown key '{key}'. Known keys: {}",
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Directory the renderer writes into.
    #[must_use]
    pub fn output_dir(&self, paths: &AppPaths) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| paths.images_dir.clone())
    }

    /// Jar handed to discovery: the configured one, else the default location if present.
    #[must_use]
    pub fn jar(&self, paths: &AppPaths) -> Option<PathBuf> {
        self.jar_path.clone().or_else(|| {
            let default = paths.default_jar();
            default.is_file().then_some(default)
        })
    }

    /// Loop configuration derived from these settings.
    #[must_use]
    pub fn run_config(&self) -> RunConfig {
        RunConfig::default()
            .with_max_attempts(self.max_retries)
            .with_improve_prompt(self.improve_prompt)
            .with_prompt_augmentations([self.prompt_improve_1.clone(), self.prompt_improve_2.clone()])
    }

    /// Renderer configuration derived from these settings.
    #[must_use]
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            image_format: self.image_format,
            timeout: Duration::from_secs(self.render_timeout_secs.max(1)),
            ..RenderConfig::default()
        }
    }

    /// Chat agent configuration derived from these settings.
    #[must_use]
    pub fn chat_config(&self, cwd: Option<PathBuf>) -> ChatConfig {
        ChatConfig {
            model: self.model.clone(),
            timeout: Duration::from_secs(self.chat_timeout_secs.max(1)),
            cwd,
            ..ChatConfig::default()
        }
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> AppError {
    AppError::Config(format!("Invalid value '{value}' for {key}: expected {expected}"))
}

fn parse_bool(value: &str) -> Result<bool, AppError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid("improve_prompt", value, "true or false")),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, AppError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| invalid(key, value, "a positive number of seconds"))
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from))
}

/// Accepts a number or a numeric string; anything else (or zero) becomes the default.
fn lenient_max_retries<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|n| *n >= 1).unwrap_or(DEFAULT_MAX_RETRIES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_layout() {
        let paths = AppPaths::at("/data/PlantGPT");
        assert_eq!(paths.db_dir, PathBuf::from("/data/PlantGPT/DB"));
        assert_eq!(paths.images_dir, PathBuf::from("/data/PlantGPT/Images"));
        assert_eq!(paths.default_jar(), PathBuf::from("/data/PlantGPT/PlantUML/plantuml.jar"));
        assert_eq!(paths.scheme_db(), PathBuf::from("/data/PlantGPT/DB/plantuml_schemes.db"));
    }

    #[test]
    fn test_ensure_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(dir.path().join("root"));
        paths.ensure().unwrap();

        for d in [&paths.db_dir, &paths.images_dir, &paths.methodologies_dir, &paths.plantuml_dir] {
            assert!(d.is_dir(), "{} missing", d.display());
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_legacy_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "jar_path": "",
                "output_dir": "/tmp/out",
                "improve_prompt": true,
                "max_retries": "7",
                "prompt_improve_1": "Use colors.",
                "window_geometry": "800x600"
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.jar_path, None);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
        assert!(config.improve_prompt);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.prompt_improve_1, "Use colors.");
    }

    #[test]
    fn test_invalid_max_retries_falls_back() {
        for raw in [r#""many""#, "0", "-2", "null", "2.5"] {
            let config: AppConfig =
                serde_json::from_str(&format!(r#"{{"max_retries": {raw}}}"#)).unwrap();
            assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES, "{raw}");
        }
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&path), AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let mut config = AppConfig::default();
        config.set("backend", "codex").unwrap();
        config.set("image_format", "svg").unwrap();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.backend, AgentKind::Codex);
        assert_eq!(loaded.image_format, ImageFormat::Svg);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = AppConfig::default();
        assert!(config.set("max_retries", "0").is_err());
        assert!(config.set("backend", "gpt4free").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("improve_prompt", "maybe").is_err());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_set_empty_clears_optional() {
        let mut config = AppConfig::default();
        config.set("jar_path", "/opt/plantuml.jar").unwrap();
        assert_eq!(config.jar_path, Some(PathBuf::from("/opt/plantuml.jar")));
        config.set("jar_path", "").unwrap();
        assert_eq!(config.jar_path, None);
    }

    #[test]
    fn test_run_config_mapping() {
        let mut config = AppConfig::default();
        config.set("max_retries", "3").unwrap();
        config.set("improve_prompt", "true").unwrap();
        config.set("prompt_improve_2", "Label arrows.").unwrap();

        let run = config.run_config();
        assert_eq!(run.max_attempts, 3);
        assert!(run.improve_prompt);
        assert_eq!(run.prompt_augmentations, vec!["Label arrows."]);
    }

    #[test]
    fn test_output_dir_defaults_to_images() {
        let paths = AppPaths::at("/r");
        assert_eq!(AppConfig::default().output_dir(&paths), paths.images_dir);
    }
}
