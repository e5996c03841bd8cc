//! Locates CLI agent binaries on the host system.

use crate::error::ChatError;
use crate::types::AgentKind;
use std::path::PathBuf;
use which::which;

/// Locates the executable for `kind`.
///
/// Resolution order:
/// 1. `explicit_path` if provided and the file exists.
/// 2. The path in the agent's environment variable (e.g. `PLANTGPT_CLAUDE_BIN`).
/// 3. The binary name resolved via `$PATH`.
/// 4. Common install location fallbacks (platform-specific).
/// 5. Helpful error with install instructions.
///
/// # Errors
///
/// Returns `ChatError::ExecutableNotFound` when no valid executable can be
/// located.
pub fn discover_agent(kind: AgentKind, explicit_path: Option<PathBuf>) -> Result<PathBuf, ChatError> {
    // 1. Explicit path
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(path);
        }
        return Err(ChatError::ExecutableNotFound(format!(
            "Explicit path does not exist: {}",
            path.display()
        )));
    }

    // 2. Environment variable
    if let Ok(path_str) = std::env::var(kind.env_var()) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. PATH lookup
    if let Ok(path) = which(kind.binary_name()) {
        return Ok(path);
    }

    // 4. Common install locations
    for location in fallback_locations(kind) {
        if location.exists() {
            return Ok(location);
        }
    }

    // 5. Helpful error
    Err(ChatError::ExecutableNotFound(format!(
        "{kind} not found. Install: {}\nSearched: ${}, PATH, common install locations.",
        kind.install_hint(),
        kind.env_var(),
    )))
}

#[cfg(unix)]
fn fallback_locations(kind: AgentKind) -> Vec<PathBuf> {
    let name = kind.binary_name();
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".npm-global/bin").join(name));
        locations.push(home.join(".npm/bin").join(name));
        locations.push(home.join(".local/bin").join(name));
        locations.push(home.join("go/bin").join(name));
    }
    locations.push(PathBuf::from("/usr/local/bin").join(name));
    locations
}

#[cfg(windows)]
fn fallback_locations(kind: AgentKind) -> Vec<PathBuf> {
    let name = format!("{}.cmd", kind.binary_name());
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join("AppData/Roaming/npm").join(&name));
    }
    locations.push(PathBuf::from(r"C:\Program Files\nodejs").join(&name));
    locations
}
