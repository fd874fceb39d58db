//! Configuration management for the catalogue builder.
//!
//! # Overview
//!
//! Configuration lives in a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CATALOGUE_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting except the workflow documents
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ntuple_catalogue::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("catalogue.toml")?;
//! println!("Merge jobs: {}", config.merge.jobs);
//! println!("Run database: {}", config.database.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run mode
//! - [`WorkflowConfig`] - Workflow XML documents
//! - [`MergeConfig`] - Merge executable, job count, scratch space policy
//! - [`ExposureConfig`] - Exposure tree/branch and streaming batch size
//! - [`ReaderConfig`] - ROOT interpreter used to read measurement files
//! - [`DatabaseConfig`] - SQLite run database
//! - [`OutputConfig`] - Catalogue output path
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [workflow]
//! documents = [
//!     "xml/numi_fhc_workflow_core.xml",
//!     "xml/numi_fhc_workflow_detvar.xml",
//! ]
//!
//! [merge]
//! jobs = 8
//! scratch_dir = "${SCRATCH}/hadd"
//! min_free_gib = 5.0
//!
//! [database]
//! path = "/exp/uboone/data/uboonebeam/beamdb/run.db"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, CatalogueConfig, DatabaseConfig, ExposureConfig, LoggingConfig,
    MergeConfig, OutputConfig, ReaderConfig, WorkflowConfig,
};
