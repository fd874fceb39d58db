//! Catalogue builder - main orchestrator for a build
//!
//! Loads the recipe, resolves the workflow, wires the pipeline components
//! around the configured collaborators and persists the result.

use super::assembler::CatalogueAssembler;
use super::processor::SampleProcessor;
use super::summary::BuildSummary;
use super::writer::write_catalogue;
use crate::adapters::database::{ReferenceDatabase, SqliteRunDatabase};
use crate::adapters::merge::{HaddMergeTool, MergeTool};
use crate::adapters::reader::{MeasurementReader, RootMacroReader};
use crate::adapters::workflow::load_workflow_context;
use crate::config::CatalogueConfig;
use crate::core::exposure::{ExposureCache, ExposureCalculator};
use crate::core::merge::space::SpaceProbe;
use crate::core::merge::{FileMerger, StatvfsProbe};
use crate::core::triggers::{PairExtractor, TriggerAccountant};
use crate::domain::context::ResultExt;
use crate::domain::{Catalogue, Recipe, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// External capabilities a build depends on
#[derive(Clone)]
pub struct Collaborators {
    pub merge_tool: Arc<dyn MergeTool>,
    pub reader: Arc<dyn MeasurementReader>,
    pub database: Arc<dyn ReferenceDatabase>,
    pub space: Arc<dyn SpaceProbe>,
}

impl Collaborators {
    /// `hadd`, the ROOT interpreter, the SQLite run database and `statvfs`
    ///
    /// # Errors
    ///
    /// Returns an error if the reader macro cannot be written.
    pub fn production(config: &CatalogueConfig) -> Result<Self> {
        Ok(Self {
            merge_tool: Arc::new(HaddMergeTool::new(
                config.merge.executable.clone(),
                config.application.dry_run,
            )),
            reader: Arc::new(RootMacroReader::new(&config.reader)?),
            database: Arc::new(SqliteRunDatabase::new(&config.database)),
            space: Arc::new(StatvfsProbe),
        })
    }
}

/// Catalogue builder
pub struct CatalogueBuilder {
    config: CatalogueConfig,
    collaborators: Collaborators,
}

impl CatalogueBuilder {
    /// Create a builder backed by the production collaborators
    pub fn new(config: CatalogueConfig) -> Result<Self> {
        let collaborators = Collaborators::production(&config)?;
        Ok(Self::with_collaborators(config, collaborators))
    }

    pub fn with_collaborators(config: CatalogueConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Build the catalogue for the recipe at `recipe_path`
    ///
    /// This is the main entry point for a build. It:
    /// 1. Loads and validates the recipe (nothing is written if this fails)
    /// 2. Resolves stage output directories from the workflow documents
    /// 3. Creates the recipe's ntuple directory
    /// 4. Merges and normalizes every active entry
    /// 5. Writes the catalogue, unless this is a dry run
    ///
    /// # Errors
    ///
    /// Only run-level failures are returned. Failed entries are recorded in
    /// the summary and left out of the catalogue.
    pub async fn build(&self, recipe_path: &Path) -> Result<(Catalogue, BuildSummary)> {
        let start_time = Instant::now();
        let recipe = Recipe::from_file(recipe_path)?;

        tracing::info!(
            recipe = %recipe_path.display(),
            beamlines = recipe.beamlines.len(),
            active_entries = recipe.active_entry_count(),
            dry_run = self.config.application.dry_run,
            "Starting catalogue build"
        );

        let (catalogue, mut summary) = self.build_recipe(&recipe).await?;

        if self.config.application.dry_run {
            tracing::info!(
                path = %self.config.output.catalogue_path.display(),
                "[DRY RUN] Catalogue not written"
            );
        } else {
            write_catalogue(&self.config.output.catalogue_path, &catalogue)?;
            summary.catalogue_path = Some(self.config.output.catalogue_path.clone());
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok((catalogue, summary))
    }

    /// Build the catalogue for an already validated recipe without writing it
    ///
    /// # Errors
    ///
    /// Returns an error if the ntuple directory cannot be created.
    pub async fn build_recipe(&self, recipe: &Recipe) -> Result<(Catalogue, BuildSummary)> {
        let workflow = Arc::new(load_workflow_context(&self.config.workflow.documents));

        std::fs::create_dir_all(&recipe.ntuple_base_directory).with_context(|| {
            format!(
                "Failed to create ntuple directory {}",
                recipe.ntuple_base_directory.display()
            )
        })?;

        let jobs = self.config.merge.jobs;
        let merger = FileMerger::new(
            Arc::clone(&self.collaborators.merge_tool),
            Arc::clone(&self.collaborators.space),
            &self.config.merge,
            self.config.application.dry_run,
        );
        let exposure = ExposureCalculator::new(
            Arc::clone(&self.collaborators.reader),
            Arc::new(ExposureCache::new()),
            &self.config.exposure,
            jobs,
        );
        let triggers = TriggerAccountant::new(
            PairExtractor::new(Arc::clone(&self.collaborators.reader)),
            Arc::clone(&self.collaborators.database),
        );
        let processor = SampleProcessor::new(
            workflow,
            merger,
            exposure,
            triggers,
            recipe.ntuple_base_directory.clone(),
        );

        let mut summary = BuildSummary::new();
        let catalogue = CatalogueAssembler::new(processor)
            .assemble(recipe, &mut summary)
            .await;
        Ok((catalogue, summary))
    }

    /// The configuration this builder runs with
    pub fn config(&self) -> &CatalogueConfig {
        &self.config
    }
}
