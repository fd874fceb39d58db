//! Per-entry processing
//!
//! One recipe entry moves through a fixed sequence:
//!
//! 1. inactive entries are skipped untouched
//! 2. the stage name is resolved to an output directory
//! 3. the stage's files are merged into `<sample_key>.root`
//! 4. the entry is normalized according to its kind
//!
//! Any hard failure drops the entry. The caller only ever sees a finished
//! [`CatalogueEntry`], a skip, or the reason for the drop.

use crate::adapters::workflow::WorkflowContext;
use crate::core::exposure::{with_reference, ExposureCalculator};
use crate::core::merge::{FileMerger, MergeOutcome};
use crate::core::triggers::TriggerAccountant;
use crate::domain::catalogue::passthrough_fields;
use crate::domain::{CatalogueEntry, SampleError, SampleSpec, SampleType};
use crate::{log_sample_dropped, log_sample_start};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Normalization handed down from the beamline and run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Reference exposure
    pub pot: f64,

    /// Reference trigger count
    pub ext_triggers: u64,
}

/// Final state of one entry
#[derive(Debug)]
pub enum SampleOutcome {
    /// The entry is inactive
    Skipped,

    /// The entry was merged and normalized
    Annotated(CatalogueEntry),

    /// The entry failed and is left out of the catalogue
    Dropped(SampleError),
}

/// Runs recipe entries through merge and normalization
pub struct SampleProcessor {
    workflow: Arc<WorkflowContext>,
    merger: FileMerger,
    exposure: ExposureCalculator,
    triggers: TriggerAccountant,
    ntuple_dir: PathBuf,
}

impl SampleProcessor {
    pub fn new(
        workflow: Arc<WorkflowContext>,
        merger: FileMerger,
        exposure: ExposureCalculator,
        triggers: TriggerAccountant,
        ntuple_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            workflow,
            merger,
            exposure,
            triggers,
            ntuple_dir: ntuple_dir.into(),
        }
    }

    /// Processes one entry, without its detector variations
    ///
    /// `scope` names the entry's position in the recipe for logging.
    pub async fn process(
        &self,
        scope: &str,
        spec: &SampleSpec,
        normalization: Normalization,
        is_detvar: bool,
    ) -> SampleOutcome {
        if !spec.active {
            tracing::info!(scope = %scope, sample_key = %spec.sample_key, "Skipping inactive entry");
            return SampleOutcome::Skipped;
        }

        log_sample_start!(scope, spec.sample_key, spec.stage_name, is_detvar);

        let Some(stage_dir) = self.workflow.outdir(&spec.stage_name) else {
            let err = SampleError::StageUnresolved(spec.stage_name.clone());
            log_sample_dropped!(scope, spec.sample_key, err);
            return SampleOutcome::Dropped(err);
        };

        match self.annotate(spec, stage_dir, normalization, is_detvar).await {
            Ok(entry) => SampleOutcome::Annotated(entry),
            Err(err) => {
                log_sample_dropped!(scope, spec.sample_key, err);
                SampleOutcome::Dropped(err)
            }
        }
    }

    async fn annotate(
        &self,
        spec: &SampleSpec,
        stage_dir: &Path,
        normalization: Normalization,
        is_detvar: bool,
    ) -> Result<CatalogueEntry, SampleError> {
        let file_name = spec.sample_key.output_file_name();
        let destination = self.ntuple_dir.join(&file_name);

        let merge = self.merger.merge_stage(stage_dir, &destination).await?;
        let sources: Vec<PathBuf> = match merge {
            MergeOutcome::Merged { .. } => vec![destination.clone()],
            MergeOutcome::Skipped => Vec::new(),
        };

        let (pot, triggers) = if is_detvar || spec.sample_type == SampleType::Mc {
            let measured = if sources.is_empty() {
                self.exposure
                    .stream_exposure(&self.merger.discover(stage_dir))
                    .await
            } else {
                self.exposure.total_exposure(&sources).await
            };
            if measured == 0.0 {
                tracing::warn!(
                    sample_key = %spec.sample_key,
                    reference = normalization.pot,
                    "Measured exposure is zero. Using the run exposure"
                );
            }
            (with_reference(measured, normalization.pot), None)
        } else if spec.sample_type == SampleType::Ext {
            let lookup = if sources.is_empty() {
                let raw = self.merger.discover(stage_dir);
                self.triggers.count_triggers(raw.as_slice()).await?
            } else {
                self.triggers.count_triggers(&sources).await?
            };
            (0.0, Some(lookup.total))
        } else {
            (normalization.pot, Some(normalization.ext_triggers))
        };

        tracing::info!(
            sample_key = %spec.sample_key,
            pot = pot,
            triggers = ?triggers,
            output = %destination.display(),
            "Entry annotated"
        );

        Ok(CatalogueEntry {
            sample_key: spec.sample_key.clone(),
            sample_type: spec.sample_type,
            active: true,
            relative_path: file_name,
            pot,
            triggers,
            detector_variations: None,
            extra: passthrough_fields(&spec.extra),
        })
    }
}
