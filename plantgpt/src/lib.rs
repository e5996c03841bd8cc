//! PlantGPT turns natural-language prompts into rendered PlantUML diagrams.
//!
//! A CLI coding agent writes the diagram code, PlantUML renders it, and the
//! repair loop from [`repair`] feeds renderer errors back to the agent until
//! the diagram renders or the attempt budget runs out.

/// Chat agent and renderer glue for the repair loop.
pub mod backends;
/// Application directories and user configuration.
pub mod config;
/// PlantUML jar download.
pub mod download;
/// Error types for the application layer.
pub mod errors;
/// Generation requests.
pub mod generate;
/// Methodology library.
pub mod methodology;
/// First-run setup.
pub mod setup;
/// Scheme store.
pub mod store;

pub use config::{AppConfig, AppPaths};
pub use errors::AppError;
pub use generate::{generate, GenerateRequest, Generation};
pub use methodology::MethodologyLibrary;
pub use store::{ArtifactSink, Scheme, SchemeStore};
