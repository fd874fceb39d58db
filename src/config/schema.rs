//! Configuration schema types
//!
//! This module defines the configuration structure for the catalogue builder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main catalogue builder configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogueConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Workflow description documents
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// External merge tool settings
    #[serde(default)]
    pub merge: MergeConfig,

    /// Exposure reading settings
    #[serde(default)]
    pub exposure: ExposureConfig,

    /// Measurement file reader settings
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Reference run database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Catalogue output
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CatalogueConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.workflow.validate()?;
        self.merge.validate()?;
        self.exposure.validate()?;
        self.reader.validate()?;
        self.database.validate()?;
        self.output.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (log merge commands without running them)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Workflow description documents, resolved in order
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    /// Paths to the workflow XML documents
    #[serde(default)]
    pub documents: Vec<PathBuf>,
}

impl WorkflowConfig {
    fn validate(&self) -> Result<(), String> {
        if self.documents.is_empty() {
            return Err("workflow.documents must list at least one document".to_string());
        }
        Ok(())
    }
}

/// External merge tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Merge executable name or path
    #[serde(default = "default_merge_executable")]
    pub executable: String,

    /// Job count shared by the merge tool and the exposure reader pool
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Scratch directory for parallel merge temporaries
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Free space required in `scratch_dir` before a parallel merge is allowed
    #[serde(default = "default_min_free_gib")]
    pub min_free_gib: f64,
}

impl MergeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.executable.trim().is_empty() {
            return Err("merge.executable cannot be empty".to_string());
        }
        if self.jobs == 0 {
            return Err("merge.jobs must be > 0".to_string());
        }
        if !self.min_free_gib.is_finite() || self.min_free_gib < 0.0 {
            return Err("merge.min_free_gib must be a non-negative number".to_string());
        }
        Ok(())
    }

    /// Minimum free scratch space in bytes
    pub fn min_free_bytes(&self) -> u64 {
        (self.min_free_gib * GIB) as u64
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            executable: default_merge_executable(),
            jobs: default_jobs(),
            scratch_dir: default_scratch_dir(),
            min_free_gib: default_min_free_gib(),
        }
    }
}

/// Exposure reading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureConfig {
    /// Tree holding per-subrun exposure
    #[serde(default = "default_exposure_tree")]
    pub tree: String,

    /// Branch holding the exposure value
    #[serde(default = "default_exposure_branch")]
    pub branch: String,

    /// Files read per batch when streaming exposure from a stage directory
    #[serde(default = "default_stream_batch_size")]
    pub stream_batch_size: usize,
}

impl ExposureConfig {
    fn validate(&self) -> Result<(), String> {
        if self.tree.trim().is_empty() || self.branch.trim().is_empty() {
            return Err("exposure.tree and exposure.branch cannot be empty".to_string());
        }
        if self.stream_batch_size == 0 {
            return Err("exposure.stream_batch_size must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            tree: default_exposure_tree(),
            branch: default_exposure_branch(),
            stream_batch_size: default_stream_batch_size(),
        }
    }
}

/// Measurement file reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// ROOT interpreter used to read measurement files
    #[serde(default = "default_root_executable")]
    pub root_executable: String,
}

impl ReaderConfig {
    fn validate(&self) -> Result<(), String> {
        if self.root_executable.trim().is_empty() {
            return Err("reader.root_executable cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            root_executable: default_root_executable(),
        }
    }
}

/// Reference run database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite run database path
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Table keyed by (run, subrun)
    #[serde(default = "default_database_table")]
    pub table: String,

    /// Column holding the trigger count
    #[serde(default = "default_trigger_column")]
    pub trigger_column: String,
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("database.table", &self.table),
            ("database.trigger_column", &self.trigger_column),
        ] {
            if !is_sql_identifier(value) {
                return Err(format!(
                    "Invalid {field} '{value}'. Use letters, digits and underscores only"
                ));
            }
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            table: default_database_table(),
            trigger_column: default_trigger_column(),
        }
    }
}

/// Catalogue output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the catalogue document is written
    #[serde(default = "default_catalogue_path")]
    pub catalogue_path: PathBuf,
}

impl OutputConfig {
    fn validate(&self) -> Result<(), String> {
        if self.catalogue_path.file_name().is_none() {
            return Err("output.catalogue_path must name a file".to_string());
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            catalogue_path: default_catalogue_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when file logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn is_sql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_merge_executable() -> String {
    "hadd".to_string()
}

pub(crate) fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("ntuple-catalogue")
}

fn default_min_free_gib() -> f64 {
    5.0
}

fn default_exposure_tree() -> String {
    "nuselection/SubRun".to_string()
}

fn default_exposure_branch() -> String {
    "pot".to_string()
}

fn default_stream_batch_size() -> usize {
    64
}

fn default_root_executable() -> String {
    "root".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("run.db")
}

fn default_database_table() -> String {
    "runinfo".to_string()
}

fn default_trigger_column() -> String {
    "EXTTrig".to_string()
}

fn default_catalogue_path() -> PathBuf {
    PathBuf::from("data/catalogues/samples.json")
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
