//! Exposure calculation
//!
//! Exposure is the sum of a per-subrun branch over every file of a sample.
//! Files are read concurrently, at most `jobs` at a time, and every
//! successful read is cached by [`FileStamp`]. Read failures count as zero
//! and are not cached.

pub mod cache;

use crate::adapters::reader::MeasurementReader;
use crate::config::ExposureConfig;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cache::{ExposureCache, FileStamp};

/// Replaces an exactly-zero measurement with the reference exposure
pub fn with_reference(measured: f64, reference: f64) -> f64 {
    if measured == 0.0 {
        reference
    } else {
        measured
    }
}

/// Sums exposure over measurement files
pub struct ExposureCalculator {
    reader: Arc<dyn MeasurementReader>,
    cache: Arc<ExposureCache>,
    tree: String,
    branch: String,
    jobs: usize,
    stream_batch_size: usize,
}

impl ExposureCalculator {
    pub fn new(
        reader: Arc<dyn MeasurementReader>,
        cache: Arc<ExposureCache>,
        config: &ExposureConfig,
        jobs: usize,
    ) -> Self {
        Self {
            reader,
            cache,
            tree: config.tree.clone(),
            branch: config.branch.clone(),
            jobs: jobs.max(1),
            stream_batch_size: config.stream_batch_size.max(1),
        }
    }

    /// Exposure of one file, from cache when its stamp is unchanged
    pub async fn file_exposure(&self, path: &Path) -> f64 {
        let Some(stamp) = FileStamp::of(path) else {
            tracing::warn!(file = %path.display(), "Not a regular file. Exposure counted as 0");
            return 0.0;
        };
        if let Some(cached) = self.cache.get(&stamp) {
            return cached;
        }

        match self.reader.sum_branch(path, &self.tree, &self.branch).await {
            Ok(exposure) => {
                self.cache.insert(stamp, exposure);
                exposure
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Could not read exposure. Counted as 0");
                0.0
            }
        }
    }

    /// Total exposure over `files`
    ///
    /// Reads run concurrently with at most min(file count, jobs) in flight.
    /// Values are added in input order so the total does not depend on which
    /// read finishes first.
    pub async fn total_exposure(&self, files: &[PathBuf]) -> f64 {
        if files.is_empty() {
            return 0.0;
        }
        let workers = files.len().min(self.jobs);

        let mut values: Vec<(usize, f64)> = stream::iter(files.iter().enumerate())
            .map(|(index, file)| async move { (index, self.file_exposure(file).await) })
            .buffer_unordered(workers)
            .collect()
            .await;
        values.sort_by_key(|(index, _)| *index);
        values.into_iter().map(|(_, v)| v).sum()
    }

    /// Total exposure over raw stage files, in bounded batches
    ///
    /// Used when no merged file exists. Only one batch of reads is in flight
    /// at a time.
    pub async fn stream_exposure(&self, files: &[PathBuf]) -> f64 {
        let mut total = 0.0;
        for (n, batch) in files.chunks(self.stream_batch_size).enumerate() {
            total += self.total_exposure(batch).await;
            tracing::debug!(batch = n + 1, files = batch.len(), running_total = total, "Streamed exposure batch");
        }
        total
    }
}
