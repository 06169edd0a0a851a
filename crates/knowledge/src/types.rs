//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Title shown for documents the index returned without one.
pub const UNTITLED: &str = "Untitled";

/// A document returned by the search collaborator for one query.
///
/// Lives only for the duration of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Full document text
    pub content: String,

    /// Document title, if the index has one
    #[serde(default)]
    pub title: Option<String>,

    /// Non-negative relevance score, larger is more relevant
    pub score: f32,

    /// Arbitrary index-provided metadata
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            title: None,
            score,
            metadata: empty_metadata(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Title for display, falling back to [`UNTITLED`] when absent or blank.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => UNTITLED,
        }
    }
}

/// Result of ingesting files into the local index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestStats {
    /// Documents written to the index
    pub documents_added: u32,

    /// Files skipped (unsupported extension, unreadable, or empty)
    pub files_skipped: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_fallback() {
        let doc = RetrievedDocument::new("body", 0.7);
        assert_eq!(doc.display_title(), "Untitled");

        let doc = RetrievedDocument::new("body", 0.7).with_title("   ");
        assert_eq!(doc.display_title(), "Untitled");

        let doc = RetrievedDocument::new("body", 0.7).with_title("Refunds");
        assert_eq!(doc.display_title(), "Refunds");
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let doc: RetrievedDocument =
            serde_json::from_str(r#"{"content": "text", "score": 1.5}"#).unwrap();
        assert_eq!(doc.title, None);
        assert!(doc.metadata.as_object().unwrap().is_empty());
    }
}
