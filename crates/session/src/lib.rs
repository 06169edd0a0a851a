//! Conversation sessions for kbchat.
//!
//! Ties retrieval, prompting and generation together one turn at a time and
//! keeps the bounded conversation history.

pub mod history;
pub mod session;
pub mod settings;

pub use history::HistoryManager;
pub use session::ChatSession;
pub use settings::{SessionSettings, TurnOutcome};
