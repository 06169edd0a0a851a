//! Prompt side of kbchat.
//!
//! - Handlebars templates for the grounded and ungrounded system prompts
//! - Template overrides loaded from the workspace
//! - Sanitizing of generated answers

pub mod composer;
pub mod loader;
pub mod sanitize;
pub mod types;

pub use composer::PromptComposer;
pub use loader::load_templates;
pub use sanitize::{sanitize, ResponseSanitizer};
pub use types::{PromptTemplates, PromptVariant, CORE_POLICY};
