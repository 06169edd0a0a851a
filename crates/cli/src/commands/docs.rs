//! Docs command handler.
//!
//! Manages the local document index used by the `local` search backend.

use clap::{Args, Subcommand};
use kbchat_core::{config::AppConfig, AppError, AppResult};
use kbchat_knowledge::LocalIndex;
use std::path::PathBuf;

/// Manage the local document index
#[derive(Args, Debug)]
pub struct DocsCommand {
    #[command(subcommand)]
    pub action: DocsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocsAction {
    /// Add a file or directory of documents to the index
    Add(DocsAddCommand),
    /// Show index statistics
    Stats(DocsStatsCommand),
    /// Remove every document from the index
    Reset,
}

/// Add documents to the index
#[derive(Args, Debug)]
pub struct DocsAddCommand {
    /// File or directory to ingest (.md, .markdown, .txt, .rst)
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct DocsStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DocsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let db_path = config.local_index_path().ok_or_else(|| {
            AppError::Config(
                "Document commands require the local search backend".to_string(),
            )
        })?;

        tracing::info!("Opening local index at {:?}", db_path);
        let index = LocalIndex::open(&db_path)?;

        match &self.action {
            DocsAction::Add(cmd) => cmd.execute(config, &index),
            DocsAction::Stats(cmd) => cmd.execute(&index, &db_path),
            DocsAction::Reset => {
                index.reset()?;
                println!("Local index cleared");
                Ok(())
            }
        }
    }
}

impl DocsAddCommand {
    fn execute(&self, config: &AppConfig, index: &LocalIndex) -> AppResult<()> {
        let path = config.resolve_path(&self.path);
        tracing::info!("Ingesting documents from {:?}", path);

        let stats = index.add_path(&path)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Added {} document(s), skipped {} file(s)",
                stats.documents_added, stats.files_skipped
            );
        }

        Ok(())
    }
}

impl DocsStatsCommand {
    fn execute(&self, index: &LocalIndex, db_path: &std::path::Path) -> AppResult<()> {
        let count = index.count()?;

        if self.json {
            let output = serde_json::json!({
                "path": db_path,
                "documents": count,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Index:     {}", db_path.display());
            println!("Documents: {}", count);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbchat_core::config::SearchConfig;

    #[tokio::test]
    async fn test_docs_requires_local_backend() {
        let mut config = AppConfig::default();
        config.search = SearchConfig::OpenSearch {
            endpoint: "http://localhost:9200".to_string(),
            index: "docs".to_string(),
            timeout_secs: None,
        };

        let cmd = DocsCommand {
            action: DocsAction::Reset,
        };
        assert!(matches!(
            cmd.execute(&config).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_add_then_stats() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(workspace.path().join(".kbchat")).unwrap();
        std::fs::write(
            workspace.path().join("refunds.md"),
            "# Refunds\n\nRefunds are issued within 14 days.",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.workspace = workspace.path().to_path_buf();

        let add = DocsCommand {
            action: DocsAction::Add(DocsAddCommand {
                path: PathBuf::from("refunds.md"),
                json: false,
            }),
        };
        add.execute(&config).await.unwrap();

        let db_path = config.local_index_path().unwrap();
        let index = LocalIndex::open(&db_path).unwrap();
        assert_eq!(index.count().unwrap(), 1);
    }
}
