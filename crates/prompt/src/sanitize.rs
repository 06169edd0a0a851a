//! Response sanitizing.
//!
//! Some models emit their chain of thought between reasoning markers. That
//! text is removed before an answer is shown or stored.

use kbchat_core::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_REASONING_START: &str = "<reasoning>";
pub const DEFAULT_REASONING_END: &str = "</reasoning>";

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    reasoning_pattern(DEFAULT_REASONING_START, DEFAULT_REASONING_END)
        .expect("default reasoning markers form a valid pattern")
});

fn reasoning_pattern(start: &str, end: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "(?s){}.*?{}",
        regex::escape(start),
        regex::escape(end)
    ))
}

/// Strips marked reasoning regions from generated text.
#[derive(Debug, Clone)]
pub struct ResponseSanitizer {
    pattern: Regex,
}

impl ResponseSanitizer {
    /// Build a sanitizer for custom markers.
    pub fn new(start: &str, end: &str) -> AppResult<Self> {
        if start.is_empty() || end.is_empty() {
            return Err(AppError::Prompt(
                "Reasoning markers cannot be empty".to_string(),
            ));
        }

        let pattern = reasoning_pattern(start, end)
            .map_err(|e| AppError::Prompt(format!("Invalid reasoning markers: {}", e)))?;

        Ok(Self { pattern })
    }

    /// Remove every marked region, then trim surrounding whitespace.
    ///
    /// Removal repeats until nothing matches, so text that only forms a
    /// marked region once an inner one is gone is removed too. This makes
    /// `sanitize(sanitize(x)) == sanitize(x)`.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        while self.pattern.is_match(&text) {
            text = self.pattern.replace_all(&text, "").into_owned();
        }
        text.trim().to_string()
    }
}

impl Default for ResponseSanitizer {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

/// Sanitize with the default `<reasoning>` markers.
pub fn sanitize(raw: &str) -> String {
    ResponseSanitizer::default().sanitize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_marked_region() {
        assert_eq!(sanitize("A <reasoning>hidden</reasoning> B"), "A  B");
    }

    #[test]
    fn test_removes_multiline_and_repeated_regions() {
        let raw = "<reasoning>step 1\nstep 2\n</reasoning>\nThe answer is 42.\n\
                   <reasoning>double\ncheck</reasoning>  ";
        assert_eq!(sanitize(raw), "The answer is 42.");
    }

    #[test]
    fn test_leaves_unmarked_text_alone() {
        assert_eq!(sanitize("  plain answer\n"), "plain answer");
        assert_eq!(
            sanitize("dangling <reasoning> marker"),
            "dangling <reasoning> marker"
        );
        assert_eq!(sanitize("</reasoning> reversed <reasoning>"), "</reasoning> reversed <reasoning>");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "A <reasoning>hidden</reasoning> B",
            "<reas<reasoning>x</reasoning>oning>y</reasoning> tail",
            "<reasoning>only</reasoning>",
            "   ",
            "no markers at all",
            "<reasoning>a</reasoning><reasoning>b</reasoning>c",
        ];

        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_nested_marker_fragments_are_removed() {
        assert_eq!(
            sanitize("<reas<reasoning>x</reasoning>oning>y</reasoning> tail"),
            "tail"
        );
    }

    #[test]
    fn test_custom_markers() {
        let sanitizer = ResponseSanitizer::new("<think>", "</think>").unwrap();
        assert_eq!(
            sanitizer.sanitize("<think>hmm</think>Paris. <reasoning>kept</reasoning>"),
            "Paris. <reasoning>kept</reasoning>"
        );
    }

    #[test]
    fn test_empty_markers_rejected() {
        assert!(ResponseSanitizer::new("", "</think>").is_err());
    }
}
