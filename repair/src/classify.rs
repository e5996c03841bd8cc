//! Maps a render verdict onto the failure taxonomy.

use crate::types::{FailureKind, RenderResult};

/// Marker PlantUML prints on stderr when the diagram text itself is wrong.
pub const DEFAULT_CONTENT_DEFECT_MARKER: &str = "diagram description contains errors";

/// Classifies a failed render.
///
/// `None` means no code was extracted, so nothing was rendered. A diagnostic
/// containing any of `markers` (case-insensitive) is a content defect the
/// model can fix; everything else is fatal. Tooling errors never reach this
/// function because the renderer reports them as `Err`.
#[must_use]
pub fn classify<S: AsRef<str>>(result: Option<&RenderResult>, markers: &[S]) -> FailureKind {
    let Some(result) = result else {
        return FailureKind::NoCodeExtracted;
    };

    let diagnostic = result
        .diagnostic_text
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    let is_content_defect = markers
        .iter()
        .map(|m| m.as_ref().trim().to_lowercase())
        .any(|m| !m.is_empty() && diagnostic.contains(&m));

    if is_content_defect {
        FailureKind::RetryableRenderDefect
    } else {
        FailureKind::FatalRenderDefect
    }
}
