//! Named drawing guidelines stored as `<name>.txt` files.

use std::path::{Path, PathBuf};

use thiserror::Error;

const EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum MethodologyError {
    #[error("Methodology name is empty after removing unsupported characters")]
    EmptyName,

    #[error("Methodology description is empty")]
    EmptyDescription,

    #[error("Methodology '{0}' not found")]
    NotFound(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directory of methodology files.
#[derive(Debug, Clone)]
pub struct MethodologyLibrary {
    dir: PathBuf,
}

/// Keeps alphanumerics, spaces, `_` and `-`, then trims.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

impl MethodologyLibrary {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, MethodologyError> {
        let safe = sanitize_name(name);
        if safe.is_empty() {
            return Err(MethodologyError::EmptyName);
        }
        Ok(self.dir.join(format!("{safe}.{EXTENSION}")))
    }

    /// Names of all methodologies, sorted. A missing directory lists nothing.
    ///
    /// # Errors
    /// Returns `MethodologyError::Io` if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<String>, MethodologyError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Description text of `name`.
    ///
    /// # Errors
    /// Returns `MethodologyError::NotFound` if no such methodology exists.
    pub fn load(&self, name: &str) -> Result<String, MethodologyError> {
        let path = self.path_for(name)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MethodologyError::NotFound(name.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Creates or overwrites a methodology and returns the name it was stored under.
    ///
    /// # Errors
    /// Returns an error for an empty name or description, or if the file cannot be written.
    pub fn save(&self, name: &str, description: &str) -> Result<String, MethodologyError> {
        let path = self.path_for(name)?;
        let description = description.trim();
        if description.is_empty() {
            return Err(MethodologyError::EmptyDescription);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        std::fs::write(&path, description).map_err(|e| io_error(&path, e))?;

        let stored = sanitize_name(name);
        tracing::info!(event = "methodology_saved", name = %stored, "methodology_saved");
        Ok(stored)
    }

    /// Deletes a methodology.
    ///
    /// # Errors
    /// Returns `MethodologyError::NotFound` if no such methodology exists.
    pub fn remove(&self, name: &str) -> Result<(), MethodologyError> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MethodologyError::NotFound(name.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> MethodologyError {
    MethodologyError::Io {
        path: path.to_path_buf(),
        source,
    }
}
