//! kbchat CLI
//!
//! Main entry point for the kbchat command-line tool.
//! Answers questions grounded in a knowledge base and manages the local
//! document index.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, DocsCommand};
use kbchat_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// kbchat - knowledge-base grounded chat
#[derive(Parser, Debug)]
#[command(name = "kbchat")]
#[command(about = "Answer questions from a knowledge base with an LLM", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "KBCHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "KBCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai)
    #[arg(short, long, global = true, env = "KBCHAT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "KBCHAT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one or more questions in a single conversation
    Ask(AskCommand),

    /// Manage the local document index
    Docs(DocsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Workspace and config file decide which file is merged, so they are
    // resolved before loading.
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    let config = config.with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("kbchat starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_kbchat_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Docs(_) => "docs",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Docs(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
