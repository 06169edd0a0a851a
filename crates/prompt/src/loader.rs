//! Loading template overrides from disk.

use crate::types::PromptTemplates;
use kbchat_core::{AppConfig, AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `{{context}}`, tolerating inner whitespace, whitespace control and
/// triple braces.
static CONTEXT_EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\{?~?\s*context\s*~?\}?\}\}").expect("context expression pattern is valid")
});

/// Resolve the templates for a session.
///
/// Built-in templates are used unless the configuration names override
/// files. Override paths are relative to the workspace.
pub fn load_templates(config: &AppConfig) -> AppResult<PromptTemplates> {
    let mut templates = PromptTemplates::default();

    if let Some(ref path) = config.prompts.grounded {
        templates.grounded = read_template(&config.resolve_path(path))?;
        if !CONTEXT_EXPRESSION.is_match(&templates.grounded) {
            return Err(AppError::Prompt(format!(
                "Grounded template {:?} never references {{{{context}}}}",
                path
            )));
        }
    }

    if let Some(ref path) = config.prompts.ungrounded {
        templates.ungrounded = read_template(&config.resolve_path(path))?;
    }

    Ok(templates)
}

fn read_template(path: &Path) -> AppResult<String> {
    tracing::debug!("Loading prompt template from: {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt template {:?}: {}", path, e))
    })?;

    if contents.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt template {:?} is empty",
            path
        )));
    }

    Ok(contents)
}
