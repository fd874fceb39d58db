//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the catalogue builder
//! using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// ntuple-catalogue - merge and normalize analysis samples into a catalogue
#[derive(Parser, Debug)]
#[command(name = "ntuple-catalogue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "catalogue.toml", env = "CATALOGUE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CATALOGUE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge every active sample and write the catalogue
    Build(commands::build::BuildArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Validate a recipe without processing it
    ValidateRecipe(commands::recipe::ValidateRecipeArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_build() {
        let cli = Cli::parse_from(["ntuple-catalogue", "build", "--recipe", "numi.json"]);
        assert_eq!(cli.config, "catalogue.toml");
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.recipe, "numi.json");
                assert!(!args.dry_run);
                assert!(args.jobs.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_build_overrides() {
        let cli = Cli::parse_from([
            "ntuple-catalogue",
            "build",
            "--recipe",
            "numi.json",
            "--dry-run",
            "--jobs",
            "4",
            "--output",
            "out/samples.json",
        ]);
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert!(args.dry_run);
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.output.as_deref(), Some("out/samples.json"));
    }

    #[test]
    fn test_cli_parse_with_config_and_log_level() {
        let cli = Cli::parse_from([
            "ntuple-catalogue",
            "--config",
            "custom.toml",
            "--log-level",
            "debug",
            "validate-config",
        ]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_validate_recipe() {
        let cli = Cli::parse_from(["ntuple-catalogue", "validate-recipe", "--recipe", "r.json"]);
        assert!(matches!(cli.command, Commands::ValidateRecipe(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["ntuple-catalogue", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
