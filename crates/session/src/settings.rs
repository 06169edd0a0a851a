//! Per-session settings and turn results.

use kbchat_core::AppConfig;
use kbchat_llm::LlmUsage;
use serde::Serialize;

/// Read-only settings a session is constructed with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Model identifier passed to the generation collaborator
    pub model: String,

    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,

    /// Whether turns consult the search collaborator
    pub retrieval_enabled: bool,
    pub top_k: usize,
    pub min_score: f32,

    /// Sliding-window size of the conversation history, in exchanges
    pub max_exchanges: usize,
}

impl SessionSettings {
    /// Snapshot the session-relevant parts of the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.sampling.max_tokens,
            temperature: config.sampling.temperature,
            top_p: config.sampling.top_p,
            retrieval_enabled: config.retrieval.enabled,
            top_k: config.retrieval.top_k,
            min_score: config.retrieval.min_score,
            max_exchanges: config.history.max_exchanges,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// What a completed turn reports back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Sanitized answer, as stored in history
    pub answer: String,

    /// Whether the answer was grounded in retrieved context
    pub used_retrieval: bool,

    /// Number of documents that made it into the context
    pub documents_used: usize,

    #[serde(skip)]
    pub usage: LlmUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = AppConfig::default();
        config.model = "gpt-oss-20b".to_string();
        config.retrieval.enabled = false;
        config.history.max_exchanges = 4;

        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.model, "gpt-oss-20b");
        assert!(!settings.retrieval_enabled);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.min_score, 0.5);
        assert_eq!(settings.max_tokens, 512);
        assert_eq!(settings.max_exchanges, 4);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = TurnOutcome {
            answer: "14 days.".to_string(),
            used_retrieval: true,
            documents_used: 1,
            usage: LlmUsage::new(10, 2),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["usedRetrieval"], true);
        assert_eq!(json["documentsUsed"], 1);
        assert!(json.get("usage").is_none());
    }
}
