//! Validate recipe command implementation

use crate::domain::{Recipe, SampleType};
use clap::Args;

/// Arguments for the validate-recipe command
#[derive(Args, Debug)]
pub struct ValidateRecipeArgs {
    /// Recipe JSON file
    #[arg(short, long)]
    pub recipe: String,
}

impl ValidateRecipeArgs {
    /// Execute the validate-recipe command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(recipe = %self.recipe, "Validating recipe");

        println!("🔍 Validating recipe: {}", self.recipe);
        println!();

        let recipe = match Recipe::from_file(&self.recipe) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Recipe is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Recipe is valid");
        println!();
        println!("  Ntuple directory: {}", recipe.ntuple_base_directory.display());
        for (key, beamline) in &recipe.beamlines {
            let state = if beamline.active { "" } else { " (inactive)" };
            println!("  {key} [mode {}]{state}", beamline.key.mode());
            for (run_id, run) in &beamline.runs {
                let count = |kind: SampleType| {
                    run.samples
                        .iter()
                        .filter(|s| s.active && s.sample_type == kind)
                        .count()
                };
                println!(
                    "    {run_id}: {} samples ({} mc, {} data, {} ext active)",
                    run.samples.len(),
                    count(SampleType::Mc),
                    count(SampleType::Data),
                    count(SampleType::Ext)
                );
            }
        }
        println!();
        println!("  Active entries: {}", recipe.active_entry_count());
        println!();

        Ok(0)
    }
}
