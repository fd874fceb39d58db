//! File merging
//!
//! Turns a stage output directory into one merged measurement file per
//! sample. The merger owns the destination lifecycle: the output directory is
//! created and checked for write access, any previous output is removed, and
//! the merge tool is only invoked when the stage directory holds input files.

pub mod space;

use crate::adapters::merge::{MergeRequest, MergeStrategy, MergeTool};
use crate::config::MergeConfig;
use crate::domain::SampleError;
use dashmap::DashMap;
use space::{is_writable_dir, SpaceProbe};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub use space::StatvfsProbe;

const INPUT_EXTENSION: &str = "root";
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Result of merging a stage directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merge tool produced the destination file
    Merged { inputs: usize },

    /// No input files were found, nothing was merged
    Skipped,
}

/// Merges discovered input files into per-sample destinations
pub struct FileMerger {
    tool: Arc<dyn MergeTool>,
    probe: Arc<dyn SpaceProbe>,
    listings: DashMap<PathBuf, Arc<Vec<PathBuf>>>,
    jobs: usize,
    scratch_dir: PathBuf,
    min_free_bytes: u64,
    dry_run: bool,
}

impl FileMerger {
    pub fn new(
        tool: Arc<dyn MergeTool>,
        probe: Arc<dyn SpaceProbe>,
        config: &MergeConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            tool,
            probe,
            listings: DashMap::new(),
            jobs: config.jobs.max(1),
            scratch_dir: config.scratch_dir.clone(),
            min_free_bytes: config.min_free_bytes(),
            dry_run,
        }
    }

    /// Input files under `dir`, recursively, sorted
    ///
    /// The first listing of a directory is cached for the life of the merger,
    /// so files that appear later are not seen.
    pub fn discover(&self, dir: &Path) -> Arc<Vec<PathBuf>> {
        if let Some(listing) = self.listings.get(dir) {
            return Arc::clone(listing.value());
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(directory = %dir.display(), error = %e, "Skipping unreadable path");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == INPUT_EXTENSION))
            .collect();
        files.sort();

        tracing::debug!(directory = %dir.display(), files = files.len(), "Listed input files");

        Arc::clone(
            self.listings
                .entry(dir.to_path_buf())
                .or_insert_with(|| Arc::new(files))
                .value(),
        )
    }

    /// Chooses between single-stream and multi-worker merging
    ///
    /// Multi-worker merging needs more than one job and enough free space in
    /// the scratch directory. A scratch directory that cannot be created or
    /// probed counts as having no free space.
    pub fn select_strategy(&self) -> MergeStrategy {
        if self.jobs <= 1 {
            return MergeStrategy::SingleStream;
        }

        let free = fs::create_dir_all(&self.scratch_dir)
            .and_then(|_| self.probe.free_bytes(&self.scratch_dir))
            .unwrap_or_else(|e| {
                tracing::warn!(
                    scratch_dir = %self.scratch_dir.display(),
                    error = %e,
                    "Could not evaluate free space. Falling back to single-process merge"
                );
                0
            });

        if free < self.min_free_bytes {
            tracing::info!(
                scratch_dir = %self.scratch_dir.display(),
                free_gib = format!("{:.1}", free as f64 / GIB),
                "Not enough scratch space for a parallel merge. Falling back to single-process merge"
            );
            return MergeStrategy::SingleStream;
        }

        MergeStrategy::MultiWorker {
            jobs: self.jobs,
            scratch_dir: self.scratch_dir.clone(),
        }
    }

    /// Creates the destination directory and clears any previous output
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or written, or if an existing
    /// destination cannot be removed.
    pub fn prepare_destination(&self, destination: &Path) -> Result<(), SampleError> {
        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        fs::create_dir_all(dir).map_err(|e| {
            SampleError::Io(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        if !is_writable_dir(dir) {
            return Err(SampleError::OutputNotWritable(dir.to_path_buf()));
        }

        if self.dry_run {
            if destination.exists() {
                tracing::info!(destination = %destination.display(), "[DRY RUN] Would remove existing output");
            }
            return Ok(());
        }

        match fs::remove_file(destination) {
            Ok(()) => {
                tracing::debug!(destination = %destination.display(), "Removed existing output");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SampleError::StaleOutput {
                path: destination.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Merges every input file under `stage_dir` into `destination`
    ///
    /// # Errors
    ///
    /// Destination preparation and merge tool failures are returned. An empty
    /// stage directory is not an error and yields [`MergeOutcome::Skipped`].
    pub async fn merge_stage(
        &self,
        stage_dir: &Path,
        destination: &Path,
    ) -> Result<MergeOutcome, SampleError> {
        self.prepare_destination(destination)?;

        let inputs = self.discover(stage_dir);
        if inputs.is_empty() {
            tracing::warn!(
                stage_dir = %stage_dir.display(),
                "No input files found. Merge skipped"
            );
            return Ok(MergeOutcome::Skipped);
        }

        let request = MergeRequest {
            inputs: inputs.as_ref().clone(),
            destination: destination.to_path_buf(),
            strategy: self.select_strategy(),
        };

        if let Err(e) = self.tool.merge(&request).await {
            tracing::error!(
                command = %self.tool.command_line(&request).join(" "),
                error = %e,
                "Merge command failed"
            );
            return Err(e);
        }

        Ok(MergeOutcome::Merged {
            inputs: request.inputs.len(),
        })
    }
}
