//! Reference database layer
//!
//! A trait-based abstraction over the run database so the trigger accountant
//! can be exercised without an SQLite file.

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteRunDatabase;
pub use traits::{ReferenceDatabase, TriggerLookup};
