//! Quarry - cached resource fetcher
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use quarry::cli::{Cli, Commands};
use quarry::config::ConfigManager;
use quarry::error::QuarryResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> QuarryResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("quarry=warn"),
        1 => EnvFilter::new("quarry=info"),
        _ => EnvFilter::new("quarry=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    }

    match cli.command {
        Commands::Fetch(args) => quarry::cli::commands::fetch(args, &config).await,
        Commands::Cache(args) => quarry::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            quarry::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
