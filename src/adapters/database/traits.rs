//! Reference database abstraction
//!
//! The catalogue only needs one question answered by the run database: how
//! many triggers were recorded for a set of (run, subrun) pairs.

use crate::domain::{Result, RunSubrun};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Result of a trigger lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerLookup {
    /// Trigger count summed over every pair found in the database
    pub total: u64,

    /// Pairs with no row in the database, in ascending order
    pub missing: Vec<RunSubrun>,

    /// Trigger count per run, for diagnostics
    pub by_run: BTreeMap<i64, u64>,
}

/// Read-only access to the run reference database
#[async_trait]
pub trait ReferenceDatabase: Send + Sync {
    /// Look up the trigger count for a set of pairs
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or queried.
    async fn lookup(&self, pairs: &BTreeSet<RunSubrun>) -> Result<TriggerLookup>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
