//! Domain error types
//!
//! This module defines the error hierarchy for the catalogue builder.
//! Run-level failures use [`CatalogueError`]; failures scoped to a single
//! recipe entry use [`SampleError`] so the assembler can drop the entry and
//! keep going.

use std::path::PathBuf;
use thiserror::Error;

/// Main catalogue error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Recipe document is unreadable or violates the recipe schema
    #[error("Recipe error: {0}")]
    Recipe(String),

    /// Workflow description errors
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Reference database errors
    #[error("Database error: {0}")]
    Database(String),

    /// Measurement file reader errors
    #[error("Reader error: {0}")]
    Reader(String),

    /// A per-entry failure that escaped its entry
    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Hard failures scoped to one recipe entry
///
/// Any of these drops the entry from the catalogue. Siblings are unaffected.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The entry's stage name has no resolved output directory
    #[error("Stage '{0}' not found in workflow outdirs")]
    StageUnresolved(String),

    /// The per-sample output directory cannot be written
    #[error("Output directory '{}' is not writable", .0.display())]
    OutputNotWritable(PathBuf),

    /// A previous output file exists and could not be removed
    #[error("Cannot remove existing file '{}': {reason}", path.display())]
    StaleOutput { path: PathBuf, reason: String },

    /// The merge executable is not on PATH
    #[error("Merge executable '{0}' not found")]
    MergeToolMissing(String),

    /// The merge executable ran and failed
    #[error("Merge failed: {0}")]
    MergeFailed(String),

    /// Trigger lookup against the reference database failed
    #[error("Trigger lookup failed: {0}")]
    Database(String),

    /// Any other I/O failure while handling the entry
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SampleError {
    fn from(err: std::io::Error) -> Self {
        SampleError::Io(err.to_string())
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CatalogueError {
    fn from(err: std::io::Error) -> Self {
        CatalogueError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CatalogueError {
    fn from(err: serde_json::Error) -> Self {
        CatalogueError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CatalogueError {
    fn from(err: toml::de::Error) -> Self {
        CatalogueError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<rusqlite::Error> for CatalogueError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogueError::Database(err.to_string())
    }
}
