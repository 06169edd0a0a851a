//! Command handlers for the kbchat CLI.

pub mod ask;
pub mod docs;

pub use ask::AskCommand;
pub use docs::DocsCommand;
