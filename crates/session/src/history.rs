//! Bounded conversation history.

use kbchat_llm::ChatMessage;

/// Ordered record of prior user/assistant exchanges, oldest first.
///
/// Only complete exchanges are stored, so the length is always even. The
/// system message is never stored here; it is rebuilt every turn.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    messages: Vec<ChatMessage>,
    max_exchanges: usize,
}

impl HistoryManager {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            messages: Vec::with_capacity(max_exchanges.saturating_mul(2).min(64)),
            max_exchanges,
        }
    }

    /// Append one exchange without enforcing the bound.
    pub fn append(&mut self, user_message: impl Into<String>, assistant_message: impl Into<String>) {
        self.messages.push(ChatMessage::user(user_message));
        self.messages.push(ChatMessage::assistant(assistant_message));
    }

    /// Drop the oldest exchanges until at most `max_exchanges` remain.
    ///
    /// Dropped messages are gone for good. Returns the retained history.
    pub fn window(&mut self, max_exchanges: usize) -> &[ChatMessage] {
        let limit = max_exchanges.saturating_mul(2);
        if self.messages.len() > limit {
            let excess = self.messages.len() - limit;
            self.messages.drain(..excess);
            tracing::debug!(
                dropped_exchanges = excess / 2,
                retained = self.messages.len(),
                "Trimmed conversation history"
            );
        }
        &self.messages
    }

    /// Append one exchange and enforce the configured bound.
    pub fn record(&mut self, user_message: impl Into<String>, assistant_message: impl Into<String>) {
        self.append(user_message, assistant_message);
        self.window(self.max_exchanges);
    }

    /// Copy of the current history for a prompt envelope.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    /// Number of stored messages (twice the number of exchanges).
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
