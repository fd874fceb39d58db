//! Catalogue assembly
//!
//! Walks beamline -> run -> sample and builds the catalogue tree from the
//! entries that made it through the [`SampleProcessor`]. Runs are processed
//! one entry at a time and an entry is only added to its run once it is
//! complete, detector variations included.

use super::processor::{Normalization, SampleOutcome, SampleProcessor};
use super::summary::{BuildSummary, DroppedEntry};
use crate::domain::{
    BeamKey, BeamlineTree, Catalogue, CatalogueEntry, CatalogueRun, Recipe, RunSpec, SampleSpec,
};
use std::collections::BTreeMap;

/// Normalization a beamline mode implies for one run
///
/// Out-of-beam beamlines carry no exposure and take the run's declared
/// trigger count. Beam-on beamlines take the run's declared exposure.
pub fn run_normalization(key: &BeamKey, run_id: &str, run: &RunSpec) -> Normalization {
    if key.is_out_of_beam() {
        return Normalization {
            pot: 0.0,
            ext_triggers: run.ext_triggers.unwrap_or(0),
        };
    }

    let pot = run.pot.unwrap_or(0.0);
    if pot == 0.0 {
        tracing::warn!(
            beamline = %key,
            run = %run_id,
            "Run has no pot for a beam-on beamline"
        );
    }
    Normalization {
        pot,
        ext_triggers: 0,
    }
}

/// Drives the sample processor over a whole recipe
pub struct CatalogueAssembler {
    processor: SampleProcessor,
}

impl CatalogueAssembler {
    pub fn new(processor: SampleProcessor) -> Self {
        Self { processor }
    }

    /// Builds the catalogue for `recipe`, recording progress in `summary`
    pub async fn assemble(&self, recipe: &Recipe, summary: &mut BuildSummary) -> Catalogue {
        let mut beamlines = BeamlineTree::new();

        for (beam_key, beamline) in &recipe.beamlines {
            if !beamline.active {
                tracing::info!(beamline = %beam_key, "Skipping inactive beamline");
                summary.beamlines_skipped += 1;
                continue;
            }
            summary.beamlines_processed += 1;

            let mut runs = BTreeMap::new();
            for (run_id, run) in &beamline.runs {
                if run.samples.is_empty() {
                    tracing::debug!(beamline = %beam_key, run = %run_id, "Skipping run without samples");
                    summary.runs_skipped += 1;
                    continue;
                }
                summary.runs_processed += 1;

                let normalization = run_normalization(&beamline.key, run_id, run);
                let scope = format!("{beam_key}/{run_id}");
                let mut samples = Vec::with_capacity(run.samples.len());
                for sample in &run.samples {
                    if let Some(entry) = self
                        .process_sample(&scope, sample, normalization, summary)
                        .await
                    {
                        samples.push(entry);
                    }
                }
                runs.insert(run_id.clone(), CatalogueRun::from_spec(run, samples));
            }

            if runs.is_empty() {
                tracing::debug!(beamline = %beam_key, "Beamline produced no runs");
                continue;
            }
            beamlines.insert(beam_key.clone(), runs);
        }

        Catalogue::new(recipe.ntuple_base_directory.clone(), beamlines)
    }

    /// A sample and its detector variations, or `None` if the sample is left out
    async fn process_sample(
        &self,
        scope: &str,
        sample: &SampleSpec,
        normalization: Normalization,
        summary: &mut BuildSummary,
    ) -> Option<CatalogueEntry> {
        let mut entry = self
            .record(scope, sample, normalization, false, summary)
            .await?;

        if !sample.detector_variations.is_empty() {
            let detvar_scope = format!("{scope}/{}", sample.sample_key);
            let mut variations = Vec::with_capacity(sample.detector_variations.len());
            for variation in &sample.detector_variations {
                if let Some(annotated) = self
                    .record(&detvar_scope, variation, normalization, true, summary)
                    .await
                {
                    variations.push(annotated);
                }
            }
            entry.detector_variations = Some(variations);
        }

        Some(entry)
    }

    async fn record(
        &self,
        scope: &str,
        spec: &SampleSpec,
        normalization: Normalization,
        is_detvar: bool,
        summary: &mut BuildSummary,
    ) -> Option<CatalogueEntry> {
        match self
            .processor
            .process(scope, spec, normalization, is_detvar)
            .await
        {
            SampleOutcome::Annotated(entry) => {
                summary.entries_annotated += 1;
                Some(entry)
            }
            SampleOutcome::Skipped => {
                summary.entries_skipped += 1;
                None
            }
            SampleOutcome::Dropped(err) => {
                summary.add_dropped(DroppedEntry::new(
                    format!("{scope}/{}", spec.sample_key),
                    err.to_string(),
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn run(pot: Option<f64>, ext_triggers: Option<u64>) -> RunSpec {
        RunSpec {
            pot,
            ext_triggers,
            samples: Vec::new(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_out_of_beam_normalization() {
        let n = run_normalization(&BeamKey::parse("numi_ext"), "run1", &run(Some(1e20), Some(42)));
        assert_eq!(n, Normalization { pot: 0.0, ext_triggers: 42 });
    }

    #[test]
    fn test_beam_on_normalization() {
        let n = run_normalization(&BeamKey::parse("numi_fhc"), "run1", &run(Some(1e20), Some(42)));
        assert_eq!(n, Normalization { pot: 1e20, ext_triggers: 0 });
    }

    #[test]
    fn test_missing_pot_is_zero() {
        let n = run_normalization(&BeamKey::parse("bnb"), "run1", &run(None, None));
        assert_eq!(n, Normalization { pot: 0.0, ext_triggers: 0 });
    }
}
