//! Core business logic for the catalogue builder.
//!
//! # Modules
//!
//! - [`merge`] - Input discovery, merge strategy and destination lifecycle
//! - [`exposure`] - Exposure sums with a per-file cache
//! - [`triggers`] - (run, subrun) extraction and trigger accounting
//! - [`catalogue`] - Per-entry processing, assembly, persistence and reporting
//!
//! # Build Workflow
//!
//! 1. **Load Recipe**: Validate role and kind before touching the filesystem
//! 2. **Resolve Workflow**: Map stage names to output directories
//! 3. **Merge**: Combine each active entry's stage files into `<sample_key>.root`
//! 4. **Normalize**: Exposure for simulation, triggers for out-of-beam,
//!    declared values for data
//! 5. **Assemble**: Fold finished entries into the beamline/run tree
//! 6. **Persist**: Write the catalogue atomically
//! 7. **Report**: Log the build summary
//!
//! # Example
//!
//! ```rust,no_run
//! use ntuple_catalogue::config::load_config;
//! use ntuple_catalogue::core::catalogue::CatalogueBuilder;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("catalogue.toml")?;
//! let builder = CatalogueBuilder::new(config)?;
//!
//! let (catalogue, summary) = builder.build(Path::new("recipes/numi_fhc.json")).await?;
//!
//! println!("Entries: {}", catalogue.entry_count());
//! println!("Dropped: {}", summary.entries_dropped());
//! # Ok(())
//! # }
//! ```

pub mod catalogue;
pub mod exposure;
pub mod merge;
pub mod triggers;
