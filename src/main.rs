// ntuple-catalogue - Ntuple merge and sample catalogue builder
// Copyright (c) 2025 ntuple-catalogue Contributors
// Licensed under the MIT License

use ntuple_catalogue::cli::{Cli, Commands};
use ntuple_catalogue::config::{load_config, LoggingConfig};
use ntuple_catalogue::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the configuration when it loads; commands report
    // configuration errors themselves.
    let config = load_config(&cli.config).ok();
    let logging_config = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            // Fall back to console-only logging at the default level
            match init_logging("info", &LoggingConfig::default()) {
                Ok(guard) => guard,
                Err(_) => process::exit(5),
            }
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "ntuple-catalogue - Ntuple merge and sample catalogue builder"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Build(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::ValidateRecipe(args) => args.execute().await,
        Commands::Init(args) => args.execute().await,
    }
}
