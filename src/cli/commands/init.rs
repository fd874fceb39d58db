//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "catalogue.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing catalogue configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. List your workflow XML documents under [workflow]");
                println!("  2. Point [database] path at the run database");
                println!("  3. Set up ROOT so that hadd and root are on PATH");
                println!("  4. Validate configuration: ntuple-catalogue validate-config");
                println!("  5. Build: ntuple-catalogue build --recipe <recipe.json>");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# ntuple-catalogue configuration

[application]
log_level = "info"
dry_run = false

[workflow]
documents = [
    "xml/numi_fhc_workflow_core.xml",
    "xml/numi_fhc_workflow_detvar.xml",
]

[merge]
executable = "hadd"
jobs = 8
scratch_dir = "/tmp/ntuple-catalogue"
min_free_gib = 5.0

[exposure]
tree = "nuselection/SubRun"
branch = "pot"

[reader]
root_executable = "root"

[database]
path = "run.db"
table = "runinfo"
trigger_column = "EXTTrig"

[output]
catalogue_path = "data/catalogues/samples.json"

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# ntuple-catalogue configuration
#
# This file contains all configuration options with examples and explanations.
# Values of the form ${VAR} are substituted from the environment, and any
# setting can be overridden with CATALOGUE_<SECTION>_<KEY>.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (log merge commands, write neither ntuples nor catalogue)
dry_run = false

# ============================================================================
# Workflow Documents
# ============================================================================
[workflow]
# Workflow XML documents. Entities and stages from all documents are pooled
# before stage output directories are resolved.
documents = [
    "xml/numi_fhc_workflow_core.xml",
    "xml/numi_fhc_workflow_detvar.xml",
]

# ============================================================================
# Merge Settings
# ============================================================================
[merge]
# Merge executable, looked up on PATH
executable = "hadd"

# Jobs for parallel merge and for the exposure reader pool
jobs = 8

# Scratch directory for parallel merge temporaries
# scratch_dir = "${SCRATCH}/hadd"
scratch_dir = "/tmp/ntuple-catalogue"

# Parallel merge is only used when scratch_dir has this much free space
min_free_gib = 5.0

# ============================================================================
# Exposure Settings
# ============================================================================
[exposure]
# Tree and branch holding per-subrun exposure
tree = "nuselection/SubRun"
branch = "pot"

# Files read per batch when streaming exposure from a stage directory
stream_batch_size = 64

# ============================================================================
# Reader Settings
# ============================================================================
[reader]
# ROOT interpreter used to read trees and branches
root_executable = "root"

# ============================================================================
# Run Database
# ============================================================================
[database]
# SQLite database with one row per (run, subrun)
path = "/exp/uboone/data/uboonebeam/beamdb/run.db"

# Table and trigger column for out-of-beam normalization
table = "runinfo"
trigger_column = "EXTTrig"

# ============================================================================
# Output
# ============================================================================
[output]
# Catalogue JSON document
catalogue_path = "data/catalogues/samples.json"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = false

# Local log directory
local_path = "logs"

# Log rotation (daily or hourly)
local_rotation = "daily"
"#
        .to_string()
    }
}
