//! Catalogue output model
//!
//! The catalogue mirrors the recipe hierarchy. Every sample that made it
//! through processing is replaced by its annotated [`CatalogueEntry`].
//! Entries are built once and never mutated after they are folded into a
//! [`CatalogueRun`].

use crate::domain::ids::SampleKey;
use crate::domain::recipe::{RunSpec, SampleType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Keys the builder computes for every entry
///
/// Recipe fields with these names are replaced, never copied through.
pub const COMPUTED_FIELDS: &[&str] = &["pot", "triggers", "relative_path", "stage_name"];

/// Recipe fields to copy into an entry, computed keys removed
pub fn passthrough_fields(extra: &Map<String, Value>) -> Map<String, Value> {
    extra
        .iter()
        .filter(|(key, _)| !COMPUTED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Annotated sample record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    /// Sample key from the recipe
    pub sample_key: SampleKey,

    /// Sample kind from the recipe
    pub sample_type: SampleType,

    /// Always true for emitted entries; kept so the record mirrors the recipe
    pub active: bool,

    /// Merged output file name relative to the catalogue's `ntupledir`
    pub relative_path: String,

    /// Exposure used to normalize this sample
    pub pot: f64,

    /// Trigger count for data and out-of-beam samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<u64>,

    /// Annotated detector variations, present when the recipe listed any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_variations: Option<Vec<CatalogueEntry>>,

    /// Recipe fields copied through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Annotated run block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueRun {
    /// Declared exposure, copied from the recipe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pot: Option<f64>,

    /// Declared trigger count, copied from the recipe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_triggers: Option<u64>,

    /// Successfully annotated samples
    pub samples: Vec<CatalogueEntry>,

    /// Run metadata copied through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogueRun {
    /// Starts an annotated run from the recipe's run block
    pub fn from_spec(spec: &RunSpec, samples: Vec<CatalogueEntry>) -> Self {
        Self {
            pot: spec.pot,
            ext_triggers: spec.ext_triggers,
            samples,
            extra: spec.extra.clone(),
        }
    }
}

/// Beamline key -> run id -> annotated run
pub type BeamlineTree = BTreeMap<String, BTreeMap<String, CatalogueRun>>;

/// Body of the catalogue document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueBody {
    /// Directory holding the merged per-sample files
    pub ntupledir: PathBuf,

    /// Annotated beamline hierarchy
    pub beamlines: BeamlineTree,
}

/// The persisted catalogue document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    /// Catalogue body
    pub samples: CatalogueBody,
}

impl Catalogue {
    /// Wraps an annotated hierarchy
    pub fn new(ntupledir: PathBuf, beamlines: BeamlineTree) -> Self {
        Self {
            samples: CatalogueBody {
                ntupledir,
                beamlines,
            },
        }
    }

    /// Total number of annotated entries, detector variations included
    pub fn entry_count(&self) -> usize {
        fn count(entries: &[CatalogueEntry]) -> usize {
            entries
                .iter()
                .map(|e| 1 + e.detector_variations.as_deref().map_or(0, count))
                .sum()
        }

        self.samples
            .beamlines
            .values()
            .flat_map(|runs| runs.values())
            .map(|run| count(&run.samples))
            .sum()
    }
}
