//! Discovery and resolution of the Java runtime and the PlantUML renderer.

use crate::error::PlantUmlError;
use crate::types::Launcher;
use std::path::PathBuf;
use which::which;

/// Environment variable that overrides the Java executable.
pub const JAVA_BIN_ENV_VAR: &str = "PLANTGPT_JAVA";

/// Environment variable that overrides the `plantuml.jar` location.
pub const PLANTUML_JAR_ENV_VAR: &str = "PLANTGPT_PLANTUML_JAR";

/// Locates the Java executable.
///
/// Resolution order:
/// 1. `explicit_path` if provided and the file exists.
/// 2. The path in the `PLANTGPT_JAVA` environment variable.
/// 3. `$JAVA_HOME/bin/java`.
/// 4. `java` resolved via `$PATH`.
///
/// # Errors
///
/// Returns `PlantUmlError::JavaNotFound` when no Java runtime can be located.
pub fn discover_java(explicit_path: Option<PathBuf>) -> Result<PathBuf, PlantUmlError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(path);
        }
        return Err(PlantUmlError::JavaNotFound(format!(
            "Explicit path does not exist: {}",
            path.display()
        )));
    }

    if let Ok(path_str) = std::env::var(JAVA_BIN_ENV_VAR) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Ok(java_home) = std::env::var("JAVA_HOME") {
        let path = PathBuf::from(java_home).join("bin").join(java_binary_name());
        if path.exists() {
            return Ok(path);
        }
    }

    which("java").map_err(|e| PlantUmlError::JavaNotFound(e.to_string()))
}

/// Locates `plantuml.jar`.
///
/// Resolution order:
/// 1. `explicit_path` if provided and the file exists.
/// 2. The path in the `PLANTGPT_PLANTUML_JAR` environment variable.
/// 3. Common install locations (`~/PlantGPT/PlantUML`, distro packages).
///
/// # Errors
///
/// Returns `PlantUmlError::ToolNotFound` when no jar can be located.
pub fn discover_jar(explicit_path: Option<PathBuf>) -> Result<PathBuf, PlantUmlError> {
    if let Some(path) = explicit_path {
        if path.is_file() {
            return Ok(path);
        }
        return Err(PlantUmlError::ToolNotFound(format!(
            "Explicit jar path does not exist: {}",
            path.display()
        )));
    }

    if let Ok(path_str) = std::env::var(PLANTUML_JAR_ENV_VAR) {
        let path = PathBuf::from(path_str);
        if path.is_file() {
            return Ok(path);
        }
    }

    fallback_jar_locations()
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            PlantUmlError::ToolNotFound(
                "plantuml.jar not found. Set jar_path in the config or PLANTGPT_PLANTUML_JAR.\n\
                 Searched: ~/PlantGPT/PlantUML, /usr/share/plantuml, /usr/share/java."
                    .to_string(),
            )
        })
}

/// Resolves a launcher for the renderer.
///
/// A jar (explicit or discovered) is preferred and paired with a Java
/// runtime. Without a jar, a `plantuml` executable on `$PATH` is used.
///
/// # Errors
///
/// Returns `PlantUmlError::ToolNotFound` if neither a jar nor a `plantuml`
/// executable is available, or `PlantUmlError::JavaNotFound` if a jar was
/// found but no Java runtime.
pub fn discover_plantuml(
    explicit_jar: Option<PathBuf>,
    explicit_java: Option<PathBuf>,
) -> Result<Launcher, PlantUmlError> {
    let explicit = explicit_jar.is_some();
    match discover_jar(explicit_jar) {
        Ok(jar) => {
            let java = discover_java(explicit_java)?;
            tracing::debug!(jar = %jar.display(), java = %java.display(), "plantuml_jar_resolved");
            Ok(Launcher::Jar { java, jar })
        }
        // An explicit jar that does not exist is a configuration error, not a
        // reason to silently pick another renderer.
        Err(e) if explicit => Err(e),
        Err(jar_err) => match which("plantuml") {
            Ok(program) => {
                tracing::debug!(program = %program.display(), "plantuml_executable_resolved");
                Ok(Launcher::Command {
                    program,
                    leading_args: Vec::new(),
                })
            }
            Err(_) => Err(jar_err),
        },
    }
}

#[cfg(windows)]
const fn java_binary_name() -> &'static str {
    "java.exe"
}

#[cfg(not(windows))]
const fn java_binary_name() -> &'static str {
    "java"
}

fn fallback_jar_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join("PlantGPT").join("PlantUML").join("plantuml.jar"));
    }
    #[cfg(unix)]
    {
        locations.push(PathBuf::from("/usr/share/plantuml/plantuml.jar"));
        locations.push(PathBuf::from("/usr/share/java/plantuml.jar"));
        locations.push(PathBuf::from("/opt/homebrew/opt/plantuml/libexec/plantuml.jar"));
    }
    locations
}
