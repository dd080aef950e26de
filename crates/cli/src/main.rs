//! docsim CLI
//!
//! Main entry point for the docsim command-line tool.
//! Ingests documents, rebuilds the flat index, and runs similarity searches.

mod commands;

use clap::{Parser, Subcommand};
use commands::{IngestCommand, RebuildCommand, SearchCommand, ShowCommand, StatsCommand};
use docsim_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use std::path::PathBuf;

/// docsim - document similarity search over a local flat index
#[derive(Parser, Debug)]
#[command(name = "docsim")]
#[command(about = "Document similarity search over a local flat index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCSIM_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log output format (pretty, json)
    #[arg(long, global = true, env = "DOCSIM_LOG_FORMAT")]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Embedding provider (mock, ollama, openai, azure-openai)
    #[arg(short, long, global = true, env = "DOCSIM_PROVIDER")]
    provider: Option<String>,

    /// Embedding model or deployment name
    #[arg(short, long, global = true, env = "DOCSIM_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest files or directories, then rebuild the index
    Ingest(IngestCommand),

    /// Rebuild the index from the stored documents
    Rebuild(RebuildCommand),

    /// Find the documents most similar to a query
    Search(SearchCommand),

    /// Show one stored document
    Show(ShowCommand),

    /// Show data directory statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        LogFormat::parse(&config.log_format)?,
    )?;

    tracing::info!("docsim starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.embedding.provider);
    tracing::debug!("Model: {}", config.embedding.model);

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Rebuild(_) => "rebuild",
        Commands::Search(_) => "search",
        Commands::Show(_) => "show",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Rebuild(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Show(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
