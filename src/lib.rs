// ntuple-catalogue - Ntuple merge and sample catalogue builder
// Copyright (c) 2025 ntuple-catalogue Contributors
// Licensed under the MIT License

//! # ntuple-catalogue
//!
//! Merges the per-job output files of analysis production stages into one
//! measurement file per sample and writes a JSON catalogue describing every
//! merged sample with the exposure and trigger counts needed to normalize it.
//!
//! ## Overview
//!
//! A build takes three inputs:
//! - a **recipe** listing beamlines, runs and samples, each sample naming the
//!   workflow stage that produced it
//! - the **workflow documents** (XML) that map stage names to output directories
//! - the **run database** (SQLite) holding per-subrun trigger counts
//!
//! and produces one merged `<sample_key>.root` per active sample plus the
//! catalogue document.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (merge, exposure, triggers, catalogue assembly)
//! - [`adapters`] - External integrations (workflow XML, merge tool, ROOT reader, run database)
//! - [`domain`] - Recipe and catalogue types, errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ntuple_catalogue::config::load_config;
//! use ntuple_catalogue::core::catalogue::CatalogueBuilder;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("catalogue.toml")?;
//!     let builder = CatalogueBuilder::new(config)?;
//!
//!     let (catalogue, summary) = builder.build(Path::new("recipes/numi_fhc.json")).await?;
//!
//!     println!(
//!         "Catalogued {} entries, dropped {}",
//!         catalogue.entry_count(),
//!         summary.entries_dropped()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Handling
//!
//! Recipe and configuration problems abort the build before anything is
//! written. Problems with a single entry (an unknown stage, a failed merge, an
//! unreachable run database) drop that entry from the catalogue and are
//! reported in the [`core::catalogue::BuildSummary`]; the rest of the build
//! carries on.
//!
//! ## Testing
//!
//! Every external capability sits behind a trait
//! ([`adapters::merge::MergeTool`], [`adapters::reader::MeasurementReader`],
//! [`adapters::database::ReferenceDatabase`], [`core::merge::space::SpaceProbe`])
//! so a build can run end to end with fakes through
//! [`core::catalogue::CatalogueBuilder::with_collaborators`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
