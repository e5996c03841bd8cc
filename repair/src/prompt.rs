//! Prompt assembly before the first attempt and mutation between attempts.

use crate::config::RunConfig;

/// Sentence appended to the prompt after the renderer rejects the diagram.
pub const DEFAULT_RETRY_PHRASE: &str =
    "The PlantUML code contains errors. Please fix it and output correct, working code.";

const IMPROVE_PREAMBLE: &str = "Invent a diagram, then generate PlantUML code that draws the diagram you invented. A detailed description of the topic follows.\n\n";
const METHODOLOGY_HEADER: &str = "Use the following methodology to draw the diagram:";
const CORRECTNESS_DIRECTIVE: &str =
    "Double-check the code and make it COMPLETELY correct so that PlantUML renders a good diagram.";

/// Builds the prompt for attempt 2 onwards from the prompt of the previous attempt.
///
/// The result always starts with `prior`, so each attempt's prompt extends
/// the one before it.
#[must_use]
pub fn mutate(prior: &str, config: &RunConfig) -> String {
    format!("{prior}\n\n{}", config.failure_retry_phrase)
}

/// Builds the prompt for attempt 1.
///
/// With `improve_prompt` off the raw prompt is used as-is, plus the
/// methodology section when one is given. With it on, the raw prompt is
/// wrapped in an invent-then-diagram preamble, followed by the methodology,
/// the configured augmentations and a closing correctness directive.
#[must_use]
pub fn assemble(raw: &str, methodology: Option<&str>, config: &RunConfig) -> String {
    let mut prompt = String::new();

    if config.improve_prompt {
        prompt.push_str(IMPROVE_PREAMBLE);
    }
    prompt.push_str(raw);

    if let Some(m) = methodology.map(str::trim).filter(|m| !m.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(METHODOLOGY_HEADER);
        prompt.push('\n');
        prompt.push_str(m);
    }

    if config.improve_prompt {
        for augmentation in config
            .prompt_augmentations
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .take(2)
        {
            prompt.push_str("\n\n");
            prompt.push_str(augmentation);
        }
        prompt.push_str("\n\n");
        prompt.push_str(CORRECTNESS_DIRECTIVE);
    }

    prompt
}
