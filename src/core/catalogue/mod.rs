//! Catalogue processing and assembly
//!
//! This module provides the catalogue pipeline, including:
//! - Per-entry merge and normalization
//! - Recipe traversal and catalogue assembly
//! - Atomic persistence
//! - Build summary and reporting

pub mod assembler;
pub mod builder;
pub mod processor;
pub mod summary;
pub mod writer;

pub use assembler::{run_normalization, CatalogueAssembler};
pub use builder::{CatalogueBuilder, Collaborators};
pub use processor::{Normalization, SampleOutcome, SampleProcessor};
pub use summary::{BuildSummary, DroppedEntry};
pub use writer::write_catalogue;
