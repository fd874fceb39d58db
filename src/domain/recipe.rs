//! Recipe documents
//!
//! A recipe describes what to catalogue: beamlines, the runs under each
//! beamline, and the samples recorded for each run. Recipes arrive as loosely
//! typed JSON and are validated into the types below before any processing
//! starts, so schema problems abort the run up front instead of surfacing
//! deep inside the pipeline.

use crate::domain::errors::CatalogueError;
use crate::domain::ids::{BeamKey, SampleKey};
use crate::domain::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Required value of the recipe `role` field
pub const RECIPE_ROLE: &str = "recipe";

/// The only `recipe_kind` a build accepts
pub const INSTANCE_KIND: &str = "instance";

/// Kind of sample an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// Simulation, normalized by measured exposure
    #[default]
    Mc,
    /// Beam-on real data, normalized by declared exposure and triggers
    Data,
    /// Out-of-beam background, normalized by trigger count
    Ext,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleType::Mc => write!(f, "mc"),
            SampleType::Data => write!(f, "data"),
            SampleType::Ext => write!(f, "ext"),
        }
    }
}

/// One sample (or detector variation) entry in a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSpec {
    /// Unique key among siblings
    pub sample_key: SampleKey,

    /// Workflow stage whose output directory holds this sample's files
    pub stage_name: String,

    /// Sample kind
    #[serde(default)]
    pub sample_type: SampleType,

    /// Inactive entries are skipped entirely
    #[serde(default = "default_true")]
    pub active: bool,

    /// Alternate-simulation siblings processed after this entry
    #[serde(default, deserialize_with = "null_as_default")]
    pub detector_variations: Vec<SampleSpec>,

    /// Fields the builder does not interpret, copied through to the catalogue
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One run block under a beamline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Declared exposure for beam-on samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pot: Option<f64>,

    /// Declared trigger count for out-of-beam samples
    ///
    /// Any non-negative JSON number is accepted; fractions are truncated.
    #[serde(
        default,
        deserialize_with = "trigger_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub ext_triggers: Option<u64>,

    /// Samples recorded for this run
    #[serde(default, deserialize_with = "null_as_default")]
    pub samples: Vec<SampleSpec>,

    /// Run metadata the builder does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A beamline block: an active flag plus runs keyed by run id
#[derive(Debug, Clone, PartialEq)]
pub struct BeamlineSpec {
    /// Parsed beamline key
    pub key: BeamKey,

    /// Inactive beamlines are skipped entirely
    pub active: bool,

    /// Runs keyed by run id
    pub runs: BTreeMap<String, RunSpec>,
}

/// A validated recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    /// Directory receiving one merged file per sample
    pub ntuple_base_directory: PathBuf,

    /// Beamlines keyed by beam key
    pub beamlines: BTreeMap<String, BeamlineSpec>,
}

impl Recipe {
    /// Reads and validates a recipe file
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Recipe`] if the file cannot be read, is not
    /// JSON, or violates the recipe schema.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CatalogueError::Recipe(format!("Failed to read recipe {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a recipe from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CatalogueError::Recipe(format!("Recipe is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validates a loosely typed recipe document
    ///
    /// Role and kind are checked before anything else.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut doc) = value else {
            return Err(CatalogueError::Recipe(
                "Recipe must be a JSON object".to_string(),
            ));
        };

        let role = doc.get("role").and_then(Value::as_str);
        if role != Some(RECIPE_ROLE) {
            return Err(CatalogueError::Recipe(format!(
                "Expected role='{RECIPE_ROLE}', found '{}'",
                role.unwrap_or("<missing>")
            )));
        }

        match doc.get("recipe_kind").and_then(Value::as_str) {
            Some(INSTANCE_KIND) => {}
            Some("template") => {
                return Err(CatalogueError::Recipe(
                    "Refusing to run on a template. Copy it and set recipe_kind='instance'"
                        .to_string(),
                ))
            }
            other => {
                return Err(CatalogueError::Recipe(format!(
                    "Expected recipe_kind='{INSTANCE_KIND}', found '{}'",
                    other.unwrap_or("<missing>")
                )))
            }
        }

        let ntuple_base_directory = match doc.remove("ntuple_base_directory") {
            Some(Value::String(dir)) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => {
                return Err(CatalogueError::Recipe(
                    "ntuple_base_directory must be a non-empty string".to_string(),
                ))
            }
        };

        let beams = match doc
            .remove("beamlines")
            .or_else(|| doc.remove("run_configurations"))
        {
            Some(Value::Object(beams)) => beams,
            Some(_) => {
                return Err(CatalogueError::Recipe(
                    "beamlines must be an object keyed by beam key".to_string(),
                ))
            }
            None => {
                return Err(CatalogueError::Recipe(
                    "Recipe has neither 'beamlines' nor 'run_configurations'".to_string(),
                ))
            }
        };

        let mut beamlines = BTreeMap::new();
        for (beam_key, block) in beams {
            let spec = parse_beamline(&beam_key, block)?;
            beamlines.insert(beam_key, spec);
        }

        Ok(Self {
            ntuple_base_directory,
            beamlines,
        })
    }

    /// Number of active sample entries, detector variations included
    pub fn active_entry_count(&self) -> usize {
        fn count(samples: &[SampleSpec]) -> usize {
            samples
                .iter()
                .filter(|s| s.active)
                .map(|s| 1 + count(&s.detector_variations))
                .sum()
        }

        self.beamlines
            .values()
            .filter(|b| b.active)
            .flat_map(|b| b.runs.values())
            .map(|r| count(&r.samples))
            .sum()
    }
}

fn parse_beamline(beam_key: &str, block: Value) -> Result<BeamlineSpec> {
    let Value::Object(block) = block else {
        return Err(CatalogueError::Recipe(format!(
            "Beamline '{beam_key}' must be an object"
        )));
    };

    let mut active = true;
    let mut runs = BTreeMap::new();
    for (key, value) in block {
        if key == "active" {
            active = value.as_bool().ok_or_else(|| {
                CatalogueError::Recipe(format!("Beamline '{beam_key}': active must be a boolean"))
            })?;
            continue;
        }

        let run: RunSpec = serde_json::from_value(value).map_err(|e| {
            CatalogueError::Recipe(format!("Beamline '{beam_key}', run '{key}': {e}"))
        })?;
        check_unique_keys(&run.samples, &format!("{beam_key}:{key}"))?;
        runs.insert(key, run);
    }

    Ok(BeamlineSpec {
        key: BeamKey::parse(beam_key),
        active,
        runs,
    })
}

fn check_unique_keys(samples: &[SampleSpec], scope: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for sample in samples {
        if !seen.insert(sample.sample_key.as_str()) {
            return Err(CatalogueError::Recipe(format!(
                "Duplicate sample_key '{}' in {scope}",
                sample.sample_key
            )));
        }
        check_unique_keys(
            &sample.detector_variations,
            &format!("{scope}:{}", sample.sample_key),
        )?;
    }
    Ok(())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn trigger_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let invalid = |found: &Value| {
        D::Error::custom(format!(
            "ext_triggers must be a non-negative number, found {found}"
        ))
    };

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(count) = n.as_u64() {
                return Ok(Some(count));
            }
            match n.as_f64() {
                Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v.trunc() as u64)),
                _ => Err(invalid(&Value::Number(n))),
            }
        }
        Some(other) => Err(invalid(&other)),
    }
}

fn default_true() -> bool {
    true
}
