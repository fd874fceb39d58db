//! Trigger accounting for out-of-beam samples
//!
//! Out-of-beam samples are normalized by the number of triggers recorded in
//! the run database for the subruns they contain.

pub mod extract;

use crate::adapters::database::{ReferenceDatabase, TriggerLookup};
use crate::domain::SampleError;
use std::path::Path;
use std::sync::Arc;

pub use extract::{ExtractionStrategy, PairExtractor, TreeSelector, KNOWN_TREES};

const MISSING_PAIRS_LOGGED: usize = 5;

/// Joins the pairs found in files against the run database
pub struct TriggerAccountant {
    extractor: PairExtractor,
    database: Arc<dyn ReferenceDatabase>,
}

impl TriggerAccountant {
    pub fn new(extractor: PairExtractor, database: Arc<dyn ReferenceDatabase>) -> Self {
        Self {
            extractor,
            database,
        }
    }

    /// Total triggers for the subruns found in `files`
    ///
    /// Files without pairs are skipped. When no file has any pairs the
    /// database is not consulted and the total is zero.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::Database`] if the lookup fails.
    pub async fn count_triggers(
        &self,
        files: &[impl AsRef<Path>],
    ) -> Result<TriggerLookup, SampleError> {
        let pairs = self.extractor.extract_all(files).await;
        if pairs.is_empty() {
            tracing::warn!(
                files = files.len(),
                "No (run, subrun) pairs found in EXT files; check tree names/paths"
            );
            return Ok(TriggerLookup::default());
        }

        let lookup = self
            .database
            .lookup(&pairs)
            .await
            .map_err(|e| SampleError::Database(e.to_string()))?;

        tracing::info!(
            pairs = pairs.len(),
            triggers = lookup.total,
            database = %self.database.describe(),
            "EXT triggers from run database"
        );
        if !lookup.missing.is_empty() {
            let shown: Vec<String> = lookup
                .missing
                .iter()
                .take(MISSING_PAIRS_LOGGED)
                .map(ToString::to_string)
                .collect();
            tracing::warn!(
                missing = lookup.missing.len(),
                first = %shown.join(", "),
                "Pairs not found in run database"
            );
        }
        tracing::debug!(by_run = ?lookup.by_run, "EXT triggers per run");

        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::reader::{MeasurementReader, TreeInfo};
    use crate::domain::{CatalogueError, Result, RunSubrun};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OnePairPerFile;

    #[async_trait]
    impl MeasurementReader for OnePairPerFile {
        async fn sum_branch(&self, _f: &Path, _t: &str, _b: &str) -> Result<f64> {
            Ok(0.0)
        }

        async fn trees(&self, file: &Path) -> Result<Vec<TreeInfo>> {
            if file.to_string_lossy().contains("empty") {
                return Ok(Vec::new());
            }
            Ok(vec![TreeInfo::new("nuselection/SubRun", &["run", "subRun"])])
        }

        async fn pairs(&self, file: &Path, _t: &str, _r: &str, _s: &str) -> Result<Vec<RunSubrun>> {
            let stem = file.file_stem().unwrap().to_string_lossy();
            let subrun: i64 = stem.trim_start_matches('s').parse().unwrap();
            Ok(vec![RunSubrun::new(1, subrun)])
        }
    }

    struct CountingDatabase {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ReferenceDatabase for CountingDatabase {
        async fn lookup(&self, pairs: &BTreeSet<RunSubrun>) -> Result<TriggerLookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CatalogueError::Database("database is locked".to_string()));
            }
            Ok(TriggerLookup {
                total: 10 * pairs.len() as u64,
                missing: Vec::new(),
                by_run: BTreeMap::from([(1, 10 * pairs.len() as u64)]),
            })
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn accountant(fail: bool) -> (TriggerAccountant, Arc<CountingDatabase>) {
        let db = Arc::new(CountingDatabase {
            calls: AtomicUsize::new(0),
            fail,
        });
        let extractor = PairExtractor::new(Arc::new(OnePairPerFile));
        (TriggerAccountant::new(extractor, db.clone()), db)
    }

    #[tokio::test]
    async fn test_counts_deduplicated_pairs() {
        let (accountant, db) = accountant(false);
        let lookup = accountant
            .count_triggers(&["s1.root", "s2.root", "dir/s2.root"][..])
            .await
            .unwrap();
        assert_eq!(lookup.total, 20);
        assert_eq!(db.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_pairs_skips_lookup() {
        let (accountant, db) = accountant(false);
        let lookup = accountant.count_triggers(&["empty.root"][..]).await.unwrap();
        assert_eq!(lookup, TriggerLookup::default());
        assert_eq!(db.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_database_failure_is_a_sample_error() {
        let (accountant, _db) = accountant(true);
        let err = accountant.count_triggers(&["s1.root"][..]).await.unwrap_err();
        assert!(matches!(err, SampleError::Database(_)));
    }
}
