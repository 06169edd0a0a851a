//! Ask command handler.
//!
//! Runs every question as one turn of a single conversation, so later
//! questions see the earlier exchanges.

use clap::Args;
use kbchat_core::{config::AppConfig, AppError, AppResult};
use kbchat_knowledge::{create_search_client, SearchClient};
use kbchat_llm::create_client;
use kbchat_session::{ChatSession, TurnOutcome};
use std::path::PathBuf;
use std::sync::Arc;

/// Ask one or more questions in a single conversation
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Questions to ask, in order
    pub questions: Vec<String>,

    /// Read additional questions from a file, one per line
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Answer from general knowledge only
    #[arg(long)]
    pub no_retrieval: bool,

    /// Maximum number of documents placed in the context
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum relevance score a document needs to be used
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Output one JSON object per answer
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let questions = self.collect_questions()?;
        if questions.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let config = self.apply_overrides(config)?;

        let api_key = config.resolve_api_key();
        let llm = create_client(&config.provider, config.endpoint.as_deref(), api_key.as_deref())?;

        let search = if config.retrieval.enabled {
            build_search(&config)
        } else {
            tracing::info!("Retrieval disabled, answering from general knowledge");
            None
        };

        let mut session = ChatSession::from_config(&config, llm, search)?;

        let failed = self.run_turns(&mut session, &questions).await?;
        if failed > 0 {
            tracing::warn!(
                "{} of {} questions could not be answered",
                failed,
                questions.len()
            );
        }

        Ok(())
    }

    /// Run every question through `session`, returning how many turns failed.
    ///
    /// A failed turn is reported and skipped; only output errors abort.
    async fn run_turns(&self, session: &mut ChatSession, questions: &[String]) -> AppResult<usize> {
        let mut failed = 0usize;
        for question in questions {
            match session.submit_turn(question).await {
                Ok(Some(outcome)) => self.print_outcome(question, &outcome)?,
                Ok(None) => tracing::debug!("Skipping blank question"),
                Err(e) => {
                    failed += 1;
                    tracing::error!("Turn failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }
        }
        Ok(failed)
    }

    /// Positional questions first, then non-blank lines of `--file`.
    fn collect_questions(&self) -> AppResult<Vec<String>> {
        let mut questions = self.questions.clone();

        if let Some(ref path) = self.file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read questions from {:?}: {}", path, e))
            })?;
            questions.extend(
                contents
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_string),
            );
        }

        Ok(questions)
    }

    /// Layer the per-invocation retrieval flags over the loaded config.
    fn apply_overrides(&self, config: &AppConfig) -> AppResult<AppConfig> {
        let mut config = config.clone();

        if self.no_retrieval {
            config.retrieval.enabled = false;
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(min_score) = self.min_score {
            config.retrieval.min_score = min_score;
        }

        config.validate()?;
        Ok(config)
    }

    fn print_outcome(&self, question: &str, outcome: &TurnOutcome) -> AppResult<()> {
        if self.json {
            let output = serde_json::json!({
                "question": question.trim(),
                "answer": outcome.answer,
                "usedRetrieval": outcome.used_retrieval,
                "documentsUsed": outcome.documents_used,
            });
            println!("{}", serde_json::to_string(&output)?);
        } else {
            println!("{}\n", outcome.answer);
        }

        tracing::debug!(
            "Tokens used: {} prompt + {} completion = {} total",
            outcome.usage.prompt_tokens,
            outcome.usage.completion_tokens,
            outcome.usage.total_tokens
        );

        Ok(())
    }
}

/// A search backend that cannot be built is treated like one that returns
/// nothing: the session falls back to ungrounded answers.
fn build_search(config: &AppConfig) -> Option<Arc<dyn SearchClient>> {
    match create_search_client(config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("Search backend unavailable, continuing without it: {}", e);
            None
        }
    }
}
