//! Nameforge CLI
//!
//! Main entry point for the nameforge command-line tool: a resumable,
//! chunked-batch enrichment pipeline for a name corpus, plus read-only
//! progress reporting.

mod commands;

use clap::{Parser, Subcommand};
use commands::{MonitorCommand, RunCommand, StatusCommand};
use nameforge_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Nameforge - resumable batch enrichment for a chunked name corpus
#[derive(Parser, Debug)]
#[command(name = "nameforge")]
#[command(about = "Resumable batch enrichment for a chunked name corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "NAMEFORGE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "NAMEFORGE_CONFIG")]
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

    /// Text-generation provider (openai)
    #[arg(short, long, global = true, env = "NAMEFORGE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "NAMEFORGE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start or resume the enrichment pipeline
    Run(RunCommand),

    /// Show current enrichment progress
    Status(StatusCommand),

    /// Periodically report enrichment progress
    Monitor(MonitorCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    // Log startup
    tracing::info!("Nameforge CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);
    tracing::debug!("Data dir: {:?}", config.data_dir());

    // Emit command span
    let command_name = match &cli.command {
        Commands::Run(_) => "run",
        Commands::Status(_) => "status",
        Commands::Monitor(_) => "monitor",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Run(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
        Commands::Monitor(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
