//! Prompt types and built-in templates.

use serde::{Deserialize, Serialize};

/// Rules shared by every system prompt.
pub const CORE_POLICY: &str = "Rules:\n\
- Provide ONLY the final answer to the user.\n\
- Do NOT explain your reasoning or thought process.\n\
- Do NOT show intermediate steps or analysis.\n\
- Keep answers short, clear, and simple.\n\
- Never invent facts.";

/// Built-in template used when retrieved context is available.
pub const GROUNDED_TEMPLATE: &str = "You are a professional AI assistant with access to a knowledge base.\n\
\n\
{{policy}}\n\
- Answer primarily from the knowledge base context below.\n\
- Use general knowledge only if the context does not contain the answer.\n\
- When the context answers the question, answer confidently and directly.\n\
\n\
{{context}}";

/// Built-in template used when answering from general knowledge.
pub const UNGROUNDED_TEMPLATE: &str = "You are a professional AI assistant.\n\
\n\
{{policy}}\n\
- Answer from your general knowledge.\n\
- If you do not know the answer, say \"I don't know\".";

/// Which system prompt a turn receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    /// Context was retrieved; answer from it first
    Grounded,

    /// No usable context; answer from general knowledge
    Ungrounded,
}

impl PromptVariant {
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::Grounded => "grounded",
            Self::Ungrounded => "ungrounded",
        }
    }
}

/// Template sources for both variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub grounded: String,
    pub ungrounded: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            grounded: GROUNDED_TEMPLATE.to_string(),
            ungrounded: UNGROUNDED_TEMPLATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_ungrounded_template_admits_ignorance() {
        assert!(UNGROUNDED_TEMPLATE.contains("I don't know"));
        assert!(!GROUNDED_TEMPLATE.contains("I don't know"));
        assert!(GROUNDED_TEMPLATE.contains("{{context}}"));
        assert!(!UNGROUNDED_TEMPLATE.contains("{{context}}"));
    }

    #[test]
    fn test_variant_template_names() {
        assert_eq!(PromptVariant::Grounded.template_name(), "grounded");
        assert_eq!(PromptVariant::Ungrounded.template_name(), "ungrounded");
    }
}
