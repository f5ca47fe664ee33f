//! Popcorn CLI - Command-line interface
//!
//! Search the movie catalog, inspect details, rate movies and manage the
//! watched list, either one command at a time or in an interactive session.

mod commands;
mod session;

use std::path::PathBuf;

use clap::Parser;
use popcorn_core::tracing_setup::{CliLogLevel, init_tracing};
use popcorn_core::{PopcornConfig, RuntimeMode};

#[derive(Parser)]
#[command(name = "popcorn")]
#[command(about = "Search movies, rate them and keep a watched list")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn")]
    log_level: CliLogLevel,

    /// Catalog to use; defaults to POPCORN_MODE, then development
    #[arg(long, global = true)]
    mode: Option<RuntimeMode>,

    /// Directory holding the watched list and logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep the watched list in memory for this run only
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PopcornConfig::from_env();
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    let logs_dir = config.storage.data_dir.join("logs");
    init_tracing(cli.log_level.as_tracing_level(), Some(&logs_dir))
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let app = commands::App::new(config, cli.ephemeral)?;
    commands::handle_command(cli.command, &app).await
}
