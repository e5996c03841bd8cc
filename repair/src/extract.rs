//! Diagram source extraction from free-form model responses.
//!
//! Models answer with prose around the code. Two shapes are recognized, in
//! order of preference:
//!
//! 1. A fenced block (three backticks, with or without an info string such
//!    as `plantuml`).
//! 2. A bare `@start...` through `@end...` span.

use regex::Regex;
use std::sync::LazyLock;

/// Three ways a fence can open: an info string alone on its line, an info
/// word followed on the same line by code that starts with punctuation
/// (`json {...}`), or code right after the backticks.
#[allow(clippy::expect_used)]
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)```(?:[a-z0-9_+.-]*[ \t]*\r?\n(.*?)|[a-z][a-z0-9_+-]+[ \t]+([^\w\s].*?)|\s*(.*?))```",
    )
    .expect("valid fenced-block pattern")
});

#[allow(clippy::expect_used)]
static START_END_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)@start\w*.*?@end\w*").expect("valid start/end pattern"));

/// Pulls the diagram source out of `response`.
///
/// Returns the trimmed content of the first fenced block, or failing that the
/// first `@start...@end...` span. A capture that is empty after trimming is
/// skipped, and `None` means neither shape holds any code.
#[must_use]
pub fn extract(response: &str) -> Option<String> {
    let fenced = FENCED_BLOCK
        .captures(response)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim())
        .filter(|code| !code.is_empty());

    if let Some(code) = fenced {
        return Some(code.to_string());
    }

    START_END_SPAN
        .find(response)
        .map(|m| m.as_str().trim())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_info_string() {
        let response = "Here you go:\n```plantuml\n@startuml\nAlice -> Bob\n@enduml\n```\nEnjoy!";
        assert_eq!(
            extract(response).as_deref(),
            Some("@startuml\nAlice -> Bob\n@enduml")
        );
    }

    #[test]
    fn test_fenced_block_info_string_is_case_insensitive() {
        let response = "```PlantUML\n@startuml\nA -> B\n@enduml\n```";
        assert_eq!(extract(response).as_deref(), Some("@startuml\nA -> B\n@enduml"));
    }

    #[test]
    fn test_fenced_block_without_info_string() {
        let response = "```\n@startuml\nA -> B\n@enduml\n```";
        assert_eq!(extract(response).as_deref(), Some("@startuml\nA -> B\n@enduml"));
    }

    #[test]
    fn test_single_line_fence() {
        let response = "```@startuml A -> B @enduml```";
        assert_eq!(extract(response).as_deref(), Some("@startuml A -> B @enduml"));
    }

    #[test]
    fn test_inline_info_word_is_not_part_of_code() {
        assert_eq!(extract("```json {\"a\": 1}\n```").as_deref(), Some("{\"a\": 1}"));
        assert_eq!(
            extract("```plantuml @startuml A -> B @enduml```").as_deref(),
            Some("@startuml A -> B @enduml")
        );
    }

    #[test]
    fn test_leading_word_of_code_is_kept() {
        let response = "```class Foo\nclass Bar\n```";
        assert_eq!(extract(response).as_deref(), Some("class Foo\nclass Bar"));
    }

    #[test]
    fn test_fenced_block_wins_over_later_span() {
        let response = "```\nclass Fenced\n```\nand also\n@startuml\nclass Bare\n@enduml";
        assert_eq!(extract(response).as_deref(), Some("class Fenced"));
    }

    #[test]
    fn test_first_of_several_fenced_blocks() {
        let response = "```plantuml\nfirst\n```\ntext\n```plantuml\nsecond\n```";
        assert_eq!(extract(response).as_deref(), Some("first"));
    }

    #[test]
    fn test_bare_span() {
        let response = "Sure.\n@StartUML\nBob -> Alice : hi\n@EndUML\nThat's all.";
        assert_eq!(
            extract(response).as_deref(),
            Some("@StartUML\nBob -> Alice : hi\n@EndUML")
        );
    }

    #[test]
    fn test_bare_span_is_non_greedy() {
        let response = "@startuml\nA\n@enduml\n\n@startuml\nB\n@enduml";
        assert_eq!(extract(response).as_deref(), Some("@startuml\nA\n@enduml"));
    }

    #[test]
    fn test_other_start_tags() {
        let response = "@startmindmap\n* root\n@endmindmap";
        assert_eq!(extract(response).as_deref(), Some(response));
    }

    #[test]
    fn test_no_code() {
        assert_eq!(extract("I cannot draw that, sorry."), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_empty_fence_falls_back_to_span() {
        let response = "```\n   \n```\n@startuml\nA -> B\n@enduml";
        assert_eq!(extract(response).as_deref(), Some("@startuml\nA -> B\n@enduml"));
    }

    #[test]
    fn test_whitespace_only_fence_is_absent() {
        assert_eq!(extract("```plantuml\n \n\t\n```"), None);
    }

    #[test]
    fn test_unterminated_fence_falls_back_to_span() {
        let response = "```plantuml\n@startuml\nA -> B\n@enduml";
        assert_eq!(extract(response).as_deref(), Some("@startuml\nA -> B\n@enduml"));
    }
}
