//! The generate-validate-repair loop.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use crate::classify::classify;
use crate::config::RunConfig;
use crate::events::ProgressEvent;
use crate::extract::extract;
use crate::metrics::{estimate_tokens, RunMetrics};
use crate::outcome::{RunOutcome, RunReport};
use crate::prompt::mutate;
use crate::traits::{ChatModel, DiagramRenderer};
use crate::types::{Attempt, FailureKind};

const NO_CODE_MESSAGE: &str = "model reply contained no diagram code";
const NO_DIAGNOSTIC_MESSAGE: &str = "renderer failed without diagnostic output";
const NO_ARTIFACT_MESSAGE: &str = "renderer reported success without an artifact path";

/// Result of a single attempt as seen by the loop.
enum Step {
    Done(RunOutcome),
    Retry { diagnostic: String },
}

/// Runs bounded call-extract-render-classify loops.
///
/// Each run asks the model for diagram code, renders it, and on a content
/// defect appends a fix-it request to the prompt and asks again. Any other
/// failure ends the run immediately.
pub struct RepairOrchestrator {
    model: Arc<dyn ChatModel>,
    renderer: Arc<dyn DiagramRenderer>,
    config: RunConfig,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl RepairOrchestrator {
    /// Creates an orchestrator with the default configuration.
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self::with_config(model, renderer, RunConfig::default())
    }

    /// Creates an orchestrator with the given configuration.
    #[must_use]
    pub fn with_config(
        model: Arc<dyn ChatModel>,
        renderer: Arc<dyn DiagramRenderer>,
        config: RunConfig,
    ) -> Self {
        Self {
            model,
            renderer,
            config,
            progress: None,
        }
    }

    /// Sets the maximum number of attempts (fluent builder pattern).
    #[must_use]
    pub fn max_attempts(mut self, max: usize) -> Self {
        self.config = self.config.with_max_attempts(max);
        self
    }

    /// Sends state transitions to `sender`. A closed receiver is ignored.
    #[must_use]
    pub fn with_progress(mut self, sender: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the loop on a dedicated tokio task.
    pub fn spawn(self, initial_prompt: String) -> JoinHandle<RunReport> {
        tokio::spawn(async move { self.run(initial_prompt).await })
    }

    /// Runs the loop to a terminal state.
    ///
    /// Never fails: every way a run can end is a [`RunOutcome`] inside the
    /// returned report.
    pub async fn run(&self, initial_prompt: String) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("repair_run", run_id = %run_id);
        self.run_inner(run_id.clone(), initial_prompt)
            .instrument(span)
            .await
    }

    async fn run_inner(&self, run_id: String, initial_prompt: String) -> RunReport {
        let start = Instant::now();
        let budget = self.config.attempt_budget();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut estimated_input_tokens = 0usize;
        let mut estimated_output_tokens = 0usize;
        let mut current_prompt = initial_prompt;
        let mut last_diagnostic = String::new();
        let mut outcome = None;

        tracing::info!(event = "run_started", max_attempts = budget, "run_started");

        for index in 1..=budget {
            let mut attempt = Attempt::new(index, current_prompt.clone());
            let step = self.attempt_once(&mut attempt, budget).await;

            estimated_input_tokens += estimate_tokens(&attempt.prompt);
            estimated_output_tokens += attempt.model_response.as_deref().map_or(0, estimate_tokens);
            attempts.push(attempt);

            match step {
                Step::Done(done) => {
                    outcome = Some(done);
                    break;
                }
                Step::Retry { diagnostic } => {
                    tracing::info!(
                        event = "attempt_rejected",
                        attempt = index,
                        max_attempts = budget,
                        diagnostic = %diagnostic,
                        "attempt_rejected"
                    );
                    last_diagnostic = diagnostic;

                    if index < budget {
                        self.emit(ProgressEvent::Mutating {
                            attempt: index,
                            kind: FailureKind::RetryableRenderDefect,
                        });
                        current_prompt = mutate(&current_prompt, &self.config);
                        if !self.config.retry_pause.is_zero() {
                            tokio::time::sleep(self.config.retry_pause).await;
                        }
                    }
                }
            }
        }

        let outcome = outcome.unwrap_or_else(|| RunOutcome::ExhaustedRetries {
            attempts: budget,
            last_diagnostic,
        });

        let metrics = RunMetrics {
            total_attempts: attempts.len(),
            wall_time: start.elapsed(),
            estimated_input_tokens,
            estimated_output_tokens,
        };

        match &outcome {
            RunOutcome::Success { artifact_path, .. } => tracing::info!(
                event = "run_succeeded",
                attempts = attempts.len(),
                artifact = %artifact_path.display(),
                "run_succeeded"
            ),
            RunOutcome::ExhaustedRetries { attempts: n, .. } => {
                tracing::warn!(event = "run_exhausted", attempts = n, "run_exhausted");
            }
            RunOutcome::FatalError { kind, message } => tracing::warn!(
                event = "run_failed",
                attempts = attempts.len(),
                kind = ?kind,
                message = %message,
                "run_failed"
            ),
        }

        self.emit(ProgressEvent::Finished {
            attempts: attempts.len(),
            outcome: outcome.clone(),
        });

        RunReport {
            run_id,
            outcome,
            attempts,
            metrics,
        }
    }

    /// Runs one attempt, filling in `attempt` as it goes.
    async fn attempt_once(&self, attempt: &mut Attempt, budget: usize) -> Step {
        let index = attempt.index;

        self.emit(ProgressEvent::Calling {
            attempt: index,
            max_attempts: budget,
        });
        let response = match self.model.complete(&attempt.prompt).await {
            Ok(response) => response,
            Err(e) => {
                return Step::Done(RunOutcome::FatalError {
                    kind: FailureKind::FatalToolingError,
                    message: e.to_string(),
                });
            }
        };
        attempt.model_response = Some(response);

        self.emit(ProgressEvent::Extracting { attempt: index });
        let Some(code) = attempt.model_response.as_deref().and_then(extract) else {
            return Step::Done(RunOutcome::FatalError {
                kind: classify::<&str>(None, &[]),
                message: NO_CODE_MESSAGE.to_string(),
            });
        };
        attempt.extracted_code = Some(code.clone());

        self.emit(ProgressEvent::Rendering { attempt: index });
        let result = match self.renderer.render(&code).await {
            Ok(result) => result,
            Err(e) => {
                return Step::Done(RunOutcome::FatalError {
                    kind: FailureKind::FatalToolingError,
                    message: e.to_string(),
                });
            }
        };
        attempt.render_result = Some(result.clone());

        if result.succeeded {
            return Step::Done(result.artifact_path.map_or_else(
                || RunOutcome::FatalError {
                    kind: FailureKind::FatalRenderDefect,
                    message: NO_ARTIFACT_MESSAGE.to_string(),
                },
                |artifact_path| RunOutcome::Success {
                    artifact_path,
                    diagram_source: code,
                },
            ));
        }

        let diagnostic = result
            .diagnostic_text
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| NO_DIAGNOSTIC_MESSAGE.to_string());
        self.emit(ProgressEvent::Classifying {
            attempt: index,
            diagnostic: diagnostic.clone(),
        });

        match classify(Some(&result), &self.config.content_defect_markers) {
            FailureKind::RetryableRenderDefect => Step::Retry { diagnostic },
            kind => Step::Done(RunOutcome::FatalError {
                kind,
                message: diagnostic,
            }),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(event);
        }
    }
}
