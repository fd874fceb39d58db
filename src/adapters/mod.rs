//! External system integrations for the catalogue builder.
//!
//! This module provides adapters for the systems a build talks to:
//!
//! - [`workflow`] - Workflow XML documents (stage output directories)
//! - [`merge`] - The external merge tool (`hadd`)
//! - [`reader`] - Measurement file reading through the ROOT interpreter
//! - [`database`] - The SQLite run database
//!
//! # Design Pattern
//!
//! Adapters isolate external tools behind traits ([`merge::MergeTool`],
//! [`reader::MeasurementReader`], [`database::ReferenceDatabase`]) so the
//! core pipeline can be tested with in-memory fakes.
//!
//! # Run Database
//!
//! ```rust,no_run
//! use ntuple_catalogue::adapters::database::{ReferenceDatabase, SqliteRunDatabase};
//! use ntuple_catalogue::config::DatabaseConfig;
//! use ntuple_catalogue::domain::RunSubrun;
//! use std::collections::BTreeSet;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SqliteRunDatabase::new(&DatabaseConfig::default());
//! let pairs = BTreeSet::from([RunSubrun::new(5000, 1), RunSubrun::new(5000, 2)]);
//! let lookup = db.lookup(&pairs).await?;
//! println!("{} triggers, {} pairs missing", lookup.total, lookup.missing.len());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod merge;
pub mod reader;
pub mod workflow;
