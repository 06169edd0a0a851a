//! Context assembly for the model prompt.

use crate::types::RetrievedDocument;
use serde::Serialize;

const CONTEXT_HEADER: &str = "Based on the following knowledge base documents:\n";

/// Formatted block of accepted documents.
///
/// An empty context means no usable material was retrieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Context {
    text: String,
    document_count: usize,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.document_count == 0
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

/// Render gated documents into a single context block.
///
/// Documents keep the order they arrive in and are numbered from 1. Each
/// entry carries its title, its score to two decimals and the full content.
pub fn format_context(documents: &[RetrievedDocument]) -> Context {
    if documents.is_empty() {
        return Context::empty();
    }

    let mut parts = Vec::with_capacity(documents.len() + 1);
    parts.push(CONTEXT_HEADER.to_string());

    for (i, doc) in documents.iter().enumerate() {
        parts.push(format!(
            "\n[Document {}] {} (Relevance: {:.2})\n{}\n",
            i + 1,
            doc.display_title(),
            doc.score,
            doc.content
        ));
    }

    Context {
        text: parts.join("\n"),
        document_count: documents.len(),
    }
}
