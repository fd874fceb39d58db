//! (run, subrun) pair extraction
//!
//! Files from different production stages keep their run/subrun record in
//! different trees. Extraction is a list of named strategies tried in order:
//! one per well-known tree path, where the first strategy that yields pairs
//! wins, followed by a fallback that unions the pairs of every tree with
//! run and subrun branches.

use crate::adapters::reader::{MeasurementReader, TreeInfo};
use crate::domain::RunSubrun;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Tree paths checked before falling back to a full scan
pub const KNOWN_TREES: [&str; 8] = [
    "nuselection/SubRun",
    "nuselection/SubRuns",
    "SubRun",
    "SubRuns",
    "subrun",
    "subruns",
    "nuselection/Events",
    "Events",
];

/// Which trees a strategy reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSelector {
    /// The tree at exactly this path
    Exact(String),
    /// Every tree with run and subrun branches
    Any,
}

/// A named way of pulling pairs out of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionStrategy {
    pub name: String,
    pub selector: TreeSelector,
}

impl ExtractionStrategy {
    pub fn exact(path: &str) -> Self {
        Self {
            name: format!("tree:{path}"),
            selector: TreeSelector::Exact(path.to_string()),
        }
    }

    pub fn scan_all() -> Self {
        Self {
            name: "scan:any-run-subrun-tree".to_string(),
            selector: TreeSelector::Any,
        }
    }

    fn selects<'a>(&self, trees: &'a [TreeInfo]) -> Vec<&'a TreeInfo> {
        match &self.selector {
            TreeSelector::Exact(path) => trees.iter().filter(|t| &t.path == path).collect(),
            TreeSelector::Any => trees.iter().collect(),
        }
    }
}

/// Pulls pairs from files using ordered strategies and a union fallback
pub struct PairExtractor {
    reader: Arc<dyn MeasurementReader>,
    primary: Vec<ExtractionStrategy>,
    fallback: ExtractionStrategy,
}

impl PairExtractor {
    /// Extractor trying [`KNOWN_TREES`] in order
    pub fn new(reader: Arc<dyn MeasurementReader>) -> Self {
        Self::with_strategies(
            reader,
            KNOWN_TREES.iter().map(|p| ExtractionStrategy::exact(p)).collect(),
            ExtractionStrategy::scan_all(),
        )
    }

    pub fn with_strategies(
        reader: Arc<dyn MeasurementReader>,
        primary: Vec<ExtractionStrategy>,
        fallback: ExtractionStrategy,
    ) -> Self {
        Self {
            reader,
            primary,
            fallback,
        }
    }

    /// Pairs in one file
    ///
    /// A file that cannot be opened yields no pairs.
    pub async fn extract_file(&self, file: &Path) -> BTreeSet<RunSubrun> {
        let trees = match self.reader.trees(file).await {
            Ok(trees) => trees,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Could not open file for pair extraction");
                return BTreeSet::new();
            }
        };

        for strategy in &self.primary {
            let pairs = self.apply(strategy, file, &trees).await;
            if !pairs.is_empty() {
                tracing::debug!(file = %file.display(), strategy = %strategy.name, pairs = pairs.len(), "Extracted pairs");
                return pairs;
            }
        }

        let pairs = self.apply(&self.fallback, file, &trees).await;
        tracing::debug!(
            file = %file.display(),
            strategy = %self.fallback.name,
            pairs = pairs.len(),
            "Extracted pairs with fallback"
        );
        pairs
    }

    /// Union of the pairs of every file
    pub async fn extract_all(&self, files: &[impl AsRef<Path>]) -> BTreeSet<RunSubrun> {
        let mut all = BTreeSet::new();
        for file in files {
            all.extend(self.extract_file(file.as_ref()).await);
        }
        all
    }

    async fn apply(
        &self,
        strategy: &ExtractionStrategy,
        file: &Path,
        trees: &[TreeInfo],
    ) -> BTreeSet<RunSubrun> {
        let mut pairs = BTreeSet::new();
        for tree in strategy.selects(trees) {
            let Some((run, subrun)) = tree.run_subrun_branches() else {
                continue;
            };
            match self.reader.pairs(file, &tree.path, run, subrun).await {
                Ok(found) => pairs.extend(found),
                Err(e) => {
                    tracing::debug!(file = %file.display(), tree = %tree.path, error = %e, "Could not read pairs from tree");
                }
            }
        }
        pairs
    }
}
