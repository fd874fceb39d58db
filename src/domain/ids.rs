//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through a catalogue build.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sample key newtype wrapper
///
/// Names one recipe entry and the per-sample output file derived from it.
///
/// # Examples
///
/// ```
/// use ntuple_catalogue::domain::ids::SampleKey;
/// use std::str::FromStr;
///
/// let key = SampleKey::from_str("numi_fhc_run1_beam").unwrap();
/// assert_eq!(key.output_file_name(), "numi_fhc_run1_beam.root");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SampleKey(String);

impl SampleKey {
    /// Creates a new SampleKey, rejecting empty keys and path separators
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("sample_key cannot be empty".to_string());
        }
        if key.contains('/') || key.contains('\\') {
            return Err(format!("sample_key '{key}' must not contain path separators"));
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the merged output for this sample
    pub fn output_file_name(&self) -> String {
        format!("{}.root", self.0)
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SampleKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SampleKey> for String {
    fn from(key: SampleKey) -> Self {
        key.0
    }
}

/// Beamline key split into beamline token and operating mode
///
/// Keys look like `numi_fhc` or `bnb-ext`. The key is split at the first `_`,
/// or failing that the first `-`. A key without a delimiter runs in `data`
/// mode.
///
/// # Examples
///
/// ```
/// use ntuple_catalogue::domain::ids::BeamKey;
///
/// let key = BeamKey::parse("numi_ext");
/// assert_eq!(key.beamline(), "numi");
/// assert!(key.is_out_of_beam());
///
/// assert_eq!(BeamKey::parse("bnb").mode(), "data");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamKey {
    raw: String,
    beamline: String,
    mode: String,
}

impl BeamKey {
    const DELIMITERS: [char; 2] = ['_', '-'];
    const DEFAULT_MODE: &'static str = "data";
    const OUT_OF_BEAM_MODE: &'static str = "ext";

    /// Parses a beamline key
    pub fn parse(raw: &str) -> Self {
        for sep in Self::DELIMITERS {
            if let Some((beamline, mode)) = raw.split_once(sep) {
                return Self {
                    raw: raw.to_string(),
                    beamline: beamline.to_string(),
                    mode: mode.to_lowercase(),
                };
            }
        }
        Self {
            raw: raw.to_string(),
            beamline: raw.to_string(),
            mode: Self::DEFAULT_MODE.to_string(),
        }
    }

    /// The key as written in the recipe
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Beamline token (e.g. `numi`)
    pub fn beamline(&self) -> &str {
        &self.beamline
    }

    /// Lower-cased mode token (e.g. `fhc`, `ext`)
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Whether this beamline carries out-of-beam samples
    pub fn is_out_of_beam(&self) -> bool {
        self.mode == Self::OUT_OF_BEAM_MODE
    }
}

impl fmt::Display for BeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A (run, subrun) identifier pair
///
/// Ordered by run then subrun so sets of pairs iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunSubrun {
    /// Run number
    pub run: i64,
    /// Subrun number within the run
    pub subrun: i64,
}

impl RunSubrun {
    /// Creates a new pair
    pub fn new(run: i64, subrun: i64) -> Self {
        Self { run, subrun }
    }
}

impl fmt::Display for RunSubrun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.run, self.subrun)
    }
}

impl From<(i64, i64)> for RunSubrun {
    fn from((run, subrun): (i64, i64)) -> Self {
        Self::new(run, subrun)
    }
}
