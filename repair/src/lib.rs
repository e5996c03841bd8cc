//! Generate-validate-repair loop for PlantUML diagrams.
//!
//! The loop sends a prompt to a [`ChatModel`], pulls diagram code out of the
//! reply, hands it to a [`DiagramRenderer`], and when the renderer rejects
//! the diagram content it rewrites the prompt so the model fixes its own
//! output. The run ends on the first success, on any non-retryable failure,
//! or when the attempt budget is spent.
//!
//! - [`RepairOrchestrator`] - the bounded retry loop
//! - [`extract`] - code extraction from model replies
//! - [`classify`] - failure taxonomy
//! - [`assemble`] / [`mutate`] - prompt construction
//! - [`RunOutcome`] / [`RunReport`] - typed results
//! - [`ProgressEvent`] - fire-and-forget state transitions

pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod metrics;
pub mod orchestrator;
pub mod outcome;
pub mod prompt;
pub mod traits;
pub mod types;

pub use classify::{classify, DEFAULT_CONTENT_DEFECT_MARKER};
pub use config::RunConfig;
pub use error::BackendError;
pub use events::ProgressEvent;
pub use extract::extract;
pub use metrics::{estimate_tokens, RunMetrics};
pub use orchestrator::RepairOrchestrator;
pub use outcome::{RunOutcome, RunReport};
pub use prompt::{assemble, mutate, DEFAULT_RETRY_PHRASE};
pub use traits::{ChatModel, DiagramRenderer};
pub use types::{Attempt, FailureKind, RenderResult};
