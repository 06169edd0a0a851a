//! Turn orchestration.
//!
//! A [`ChatSession`] owns the conversation history for one live session and
//! is its only writer. Each turn runs to completion before the next starts:
//!
//! 1. skip blank queries
//! 2. search and gate (when retrieval is enabled)
//! 3. assemble the context
//! 4. compose the system message
//! 5. build the envelope: system + history + user
//! 6. generate
//! 7. sanitize
//! 8. record the exchange and apply the window

use crate::history::HistoryManager;
use crate::settings::{SessionSettings, TurnOutcome};
use kbchat_core::{AppConfig, AppError, AppResult};
use kbchat_knowledge::{format_context, gate, RetrievedDocument, SearchClient};
use kbchat_llm::{ChatMessage, LlmClient, LlmRequest};
use kbchat_prompt::{load_templates, PromptComposer, PromptTemplates, ResponseSanitizer};
use std::sync::Arc;
use tracing::Instrument;

/// One conversation with a model, optionally backed by a document index.
///
/// Sessions never share history; concurrent conversations need one
/// `ChatSession` each.
pub struct ChatSession {
    llm: Arc<dyn LlmClient>,
    search: Option<Arc<dyn SearchClient>>,
    composer: PromptComposer,
    sanitizer: ResponseSanitizer,
    history: HistoryManager,
    settings: SessionSettings,
    turns: u64,
}

impl ChatSession {
    /// Create a session with the built-in templates and reasoning markers.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Option<Arc<dyn SearchClient>>,
        settings: SessionSettings,
    ) -> AppResult<Self> {
        let composer = PromptComposer::new(&PromptTemplates::default())?;
        Ok(Self::with_parts(
            llm,
            search,
            composer,
            ResponseSanitizer::default(),
            settings,
        ))
    }

    /// Create a session from application config, honoring template and
    /// marker overrides.
    pub fn from_config(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        search: Option<Arc<dyn SearchClient>>,
    ) -> AppResult<Self> {
        let composer = PromptComposer::new(&load_templates(config)?)?;

        let sanitizer = match (
            config.prompts.reasoning_start.as_deref(),
            config.prompts.reasoning_end.as_deref(),
        ) {
            (None, None) => ResponseSanitizer::default(),
            (start, end) => ResponseSanitizer::new(
                start.unwrap_or(kbchat_prompt::sanitize::DEFAULT_REASONING_START),
                end.unwrap_or(kbchat_prompt::sanitize::DEFAULT_REASONING_END),
            )?,
        };

        Ok(Self::with_parts(
            llm,
            search,
            composer,
            sanitizer,
            SessionSettings::from_config(config),
        ))
    }

    fn with_parts(
        llm: Arc<dyn LlmClient>,
        search: Option<Arc<dyn SearchClient>>,
        composer: PromptComposer,
        sanitizer: ResponseSanitizer,
        settings: SessionSettings,
    ) -> Self {
        Self {
            llm,
            search,
            composer,
            sanitizer,
            history: HistoryManager::new(settings.max_exchanges),
            settings,
            turns: 0,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Forget all prior exchanges.
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    /// Run one turn.
    ///
    /// Returns `Ok(None)` for a blank query without touching any state or
    /// collaborator. On a generation failure the error is returned and the
    /// history is left exactly as it was.
    pub async fn submit_turn(&mut self, query: &str) -> AppResult<Option<TurnOutcome>> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("Skipping empty query");
            return Ok(None);
        }

        self.turns += 1;
        let span = tracing::info_span!("turn", turn = self.turns);
        self.run_turn(query).instrument(span).await.map(Some)
    }

    async fn run_turn(&mut self, query: &str) -> AppResult<TurnOutcome> {
        tracing::info!("Processing turn");

        let documents = self.retrieve(query).await;
        let context = format_context(&documents);
        let used_retrieval = !context.is_empty();

        let system = self.composer.compose(&context)?;
        let messages = self.build_envelope(system, query);

        let request = LlmRequest::new(messages, &self.settings.model)
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);

        let response = self.llm.complete(&request).await.map_err(|e| {
            tracing::error!("Generation failed: {}", e);
            match e {
                AppError::Generation(_) => e,
                other => AppError::Generation(other.to_string()),
            }
        })?;

        let answer = self.sanitizer.sanitize(&response.content);
        self.history.record(query, answer.clone());

        tracing::info!(
            used_retrieval,
            documents = documents.len(),
            history = self.history.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            answer,
            used_retrieval,
            documents_used: documents.len(),
            usage: response.usage,
        })
    }

    /// Search and gate; any search failure degrades to no documents.
    async fn retrieve(&self, query: &str) -> Vec<RetrievedDocument> {
        let search = match (&self.search, self.settings.retrieval_enabled) {
            (Some(search), true) => search,
            _ => return Vec::new(),
        };

        let outcome = search
            .search(query, self.settings.top_k, self.settings.min_score)
            .await;

        let documents =
            gate::evaluate_outcome(outcome, self.settings.top_k, self.settings.min_score);
        tracing::debug!(
            backend = search.backend_name(),
            accepted = documents.len(),
            "Retrieval finished"
        );
        documents
    }

    /// System message, then prior exchanges, then the current question.
    fn build_envelope(&self, system: ChatMessage, query: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(system);
        messages.extend(self.history.snapshot());
        messages.push(ChatMessage::user(query));
        messages
    }
}
