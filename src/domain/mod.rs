//! Domain models and types for the catalogue builder.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`SampleKey`], [`BeamKey`], [`RunSubrun`])
//! - **Recipe input** ([`Recipe`], [`BeamlineSpec`], [`RunSpec`], [`SampleSpec`])
//! - **Catalogue output** ([`Catalogue`], [`CatalogueRun`], [`CatalogueEntry`])
//! - **Error types** ([`CatalogueError`], [`SampleError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, CatalogueError>`]:
//!
//! ```rust
//! use ntuple_catalogue::domain::{Recipe, Result};
//!
//! fn example() -> Result<()> {
//!     let recipe = Recipe::from_file("recipes/numi_fhc.json")?;
//!     println!("{} active entries", recipe.active_entry_count());
//!     Ok(())
//! }
//! ```

pub mod catalogue;
pub mod context;
pub mod errors;
pub mod ids;
pub mod recipe;
pub mod result;

// Re-export commonly used types for convenience
pub use catalogue::{BeamlineTree, Catalogue, CatalogueBody, CatalogueEntry, CatalogueRun};
pub use errors::{CatalogueError, SampleError};
pub use ids::{BeamKey, RunSubrun, SampleKey};
pub use recipe::{BeamlineSpec, Recipe, RunSpec, SampleSpec, SampleType};
pub use result::Result;
