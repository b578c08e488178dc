mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!("arc_cli={0},arc_orchestrator={0}", cli.log_level.as_filter())))
        .init();

    let config = config::load(cli.config.as_deref(), cli.vault)?;

    match cli.command {
        Commands::Learn { query } => commands::learn(config, query).await,
        Commands::Status { session_id } => commands::status(config, session_id).await,
        Commands::Advance { session_id, stage, query } => commands::advance(config, session_id, stage, query).await,
        Commands::Cancel { session_id } => commands::cancel(config, session_id).await,
        Commands::List => commands::list(config).await,
    }
}
