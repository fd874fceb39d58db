//! Build command implementation
//!
//! This module implements the `build` command, which merges every active
//! recipe entry and writes the catalogue.

use crate::config::load_config;
use crate::core::catalogue::CatalogueBuilder;
use crate::domain::CatalogueError;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Recipe JSON file
    #[arg(short, long)]
    pub recipe: String,

    /// Dry run mode - log merge commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the merge/read job count
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Override the catalogue output path
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Exit code for a failed build
pub fn exit_code_for(error: &CatalogueError) -> i32 {
    match error {
        CatalogueError::Configuration(_) | CatalogueError::Recipe(_) => 2,
        _ => 5,
    }
}

impl BuildArgs {
    /// Execute the build command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting build command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Some(jobs) = self.jobs {
            tracing::info!(jobs, "Overriding job count from CLI");
            config.merge.jobs = jobs;
        }
        if let Some(output) = &self.output {
            tracing::info!(output = %output, "Overriding catalogue path from CLI");
            config.output.catalogue_path = PathBuf::from(output);
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - merge commands are logged, nothing is written");
            println!();
        }

        let builder = match CatalogueBuilder::new(config) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize catalogue builder");
                eprintln!("Failed to initialize build: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🚀 Building catalogue from {}", self.recipe);
        println!();

        let (catalogue, summary) = match builder.build(Path::new(&self.recipe)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Catalogue build failed");
                eprintln!("Catalogue build failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("📊 Build Summary:");
        println!(
            "  Beamlines: {} ({} inactive)",
            summary.beamlines_processed, summary.beamlines_skipped
        );
        println!(
            "  Runs: {} ({} without samples)",
            summary.runs_processed, summary.runs_skipped
        );
        println!("  Entries annotated: {}", summary.entries_annotated);
        println!("  Entries inactive: {}", summary.entries_skipped);
        println!("  Entries dropped: {}", summary.entries_dropped());
        println!("  Catalogue entries: {}", catalogue.entry_count());
        match &summary.catalogue_path {
            Some(path) => println!("  Catalogue: {}", path.display()),
            None => println!("  Catalogue: not written (dry run)"),
        }
        println!(
            "  Started: {}",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if summary.is_successful() {
            println!("✅ Catalogue build completed");
            Ok(0)
        } else {
            println!("⚠️  Dropped entries:");
            for (i, entry) in summary.dropped.iter().enumerate() {
                if i < 10 {
                    println!("    - {}: {}", entry.path, entry.reason);
                }
            }
            if summary.dropped.len() > 10 {
                println!("    ... and {} more", summary.dropped.len() - 10);
            }
            Ok(1)
        }
    }
}
