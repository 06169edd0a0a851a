//! System prompt composition.

use crate::types::{PromptTemplates, PromptVariant, CORE_POLICY};
use handlebars::Handlebars;
use kbchat_core::{AppError, AppResult};
use kbchat_knowledge::Context;
use kbchat_llm::ChatMessage;
use std::collections::HashMap;

/// Builds the per-turn system message.
///
/// Holds compiled templates only; composing never touches conversation
/// state, so one composer can serve every turn of a session.
pub struct PromptComposer {
    registry: Handlebars<'static>,
}

impl PromptComposer {
    /// Compile both templates.
    ///
    /// # Errors
    /// Returns `AppError::Prompt` if either template fails to parse.
    pub fn new(templates: &PromptTemplates) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text, not HTML.
        registry.register_escape_fn(handlebars::no_escape);

        for (variant, source) in [
            (PromptVariant::Grounded, &templates.grounded),
            (PromptVariant::Ungrounded, &templates.ungrounded),
        ] {
            registry
                .register_template_string(variant.template_name(), source)
                .map_err(|e| {
                    AppError::Prompt(format!(
                        "Failed to register {} template: {}",
                        variant.template_name(),
                        e
                    ))
                })?;
        }

        Ok(Self { registry })
    }

    /// Pick the variant for a context: grounded exactly when it is non-empty.
    pub fn variant_for(context: &Context) -> PromptVariant {
        if context.is_empty() {
            PromptVariant::Ungrounded
        } else {
            PromptVariant::Grounded
        }
    }

    /// Render the system message for `context`.
    pub fn compose(&self, context: &Context) -> AppResult<ChatMessage> {
        let variant = Self::variant_for(context);

        let mut variables = HashMap::new();
        variables.insert("policy", CORE_POLICY);
        if variant == PromptVariant::Grounded {
            variables.insert("context", context.as_str());
        }

        let rendered = self
            .registry
            .render(variant.template_name(), &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        tracing::debug!(
            variant = variant.template_name(),
            bytes = rendered.len(),
            "Composed system prompt"
        );

        Ok(ChatMessage::system(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbchat_knowledge::{format_context, RetrievedDocument};
    use kbchat_llm::Role;

    fn composer() -> PromptComposer {
        PromptComposer::new(&PromptTemplates::default()).unwrap()
    }

    #[test]
    fn test_empty_context_uses_ungrounded_variant() {
        let message = composer().compose(&Context::empty()).unwrap();

        assert_eq!(message.role(), Role::System);
        assert!(message.content().contains("I don't know"));
        assert!(message.content().contains("general knowledge"));
        assert!(message.content().contains("Never invent facts."));
    }

    #[test]
    fn test_context_uses_grounded_variant_and_appends_it_verbatim() {
        let context = format_context(&[RetrievedDocument::new(
            "Refunds <within> 14 days & no questions asked.",
            0.8,
        )
        .with_title("Refunds")]);

        let message = composer().compose(&context).unwrap();

        assert!(!message.content().contains("I don't know"));
        assert!(message.content().contains("Answer primarily from the knowledge base"));
        assert!(message.content().contains("Provide ONLY the final answer"));
        assert!(message.content().ends_with(context.as_str()));
    }

    #[test]
    fn test_variant_selection() {
        assert_eq!(
            PromptComposer::variant_for(&Context::empty()),
            PromptVariant::Ungrounded
        );
        let context = format_context(&[RetrievedDocument::new("x", 1.0)]);
        assert_eq!(
            PromptComposer::variant_for(&context),
            PromptVariant::Grounded
        );
    }

    #[test]
    fn test_invalid_template_rejected() {
        let templates = PromptTemplates {
            grounded: "{{#if context}}unclosed".to_string(),
            ungrounded: "fine".to_string(),
        };
        assert!(matches!(
            PromptComposer::new(&templates),
            Err(AppError::Prompt(_))
        ));
    }

    #[test]
    fn test_custom_templates() {
        let templates = PromptTemplates {
            grounded: "CTX:{{context}}".to_string(),
            ungrounded: "GEN:{{policy}}".to_string(),
        };
        let composer = PromptComposer::new(&templates).unwrap();

        let message = composer.compose(&Context::empty()).unwrap();
        assert_eq!(message.content(), format!("GEN:{}", CORE_POLICY));
    }
}
