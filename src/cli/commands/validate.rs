//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the catalogue builder configuration file.

use crate::adapters::workflow::load_workflow_context;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also resolve the workflow documents and list their stages
    #[arg(long)]
    pub resolve_workflow: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Workflow Documents:");
        for doc in &config.workflow.documents {
            println!("    - {}", doc.display());
        }
        println!("  Merge Executable: {}", config.merge.executable);
        println!("  Jobs: {}", config.merge.jobs);
        println!(
            "  Scratch Directory: {} (min {:.1} GiB free for parallel merge)",
            config.merge.scratch_dir.display(),
            config.merge.min_free_gib
        );
        println!(
            "  Exposure: {}/{} (stream batch {})",
            config.exposure.tree, config.exposure.branch, config.exposure.stream_batch_size
        );
        println!("  ROOT Interpreter: {}", config.reader.root_executable);
        println!(
            "  Run Database: {} ({}.{})",
            config.database.path.display(),
            config.database.table,
            config.database.trigger_column
        );
        println!("  Catalogue: {}", config.output.catalogue_path.display());
        println!();

        if self.resolve_workflow {
            let context = load_workflow_context(&config.workflow.documents);
            println!("Resolved Stages ({}):", context.stage_count());
            for stage in context.stage_names() {
                if let Some(dir) = context.outdir(stage) {
                    println!("  {stage}: {}", dir.display());
                }
            }
            println!();
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_invalid_config_exit_code() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[workflow]\ndocuments = []").unwrap();

        let args = ValidateArgs {
            resolve_workflow: false,
        };
        let code = args.execute(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_valid_config_exit_code() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[workflow]\ndocuments = [\"/nonexistent/core.xml\"]").unwrap();

        let args = ValidateArgs {
            resolve_workflow: true,
        };
        let code = args.execute(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }
}
