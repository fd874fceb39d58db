//! Exposure cache keyed by file identity and modification time

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Identity of one version of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileStamp {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl FileStamp {
    /// Stamps a regular file, or returns `None` for anything else
    pub fn of(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            modified: metadata.modified().ok()?,
        })
    }
}

/// Read-through cache of per-file exposure
///
/// Entries are never evicted. A file rewritten with a new modification time
/// gets a new key, so its old value simply stops being looked up.
#[derive(Debug, Default)]
pub struct ExposureCache {
    entries: DashMap<FileStamp, f64>,
}

impl ExposureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stamp: &FileStamp) -> Option<f64> {
        self.entries.get(stamp).map(|v| *v)
    }

    pub fn insert(&self, stamp: FileStamp, exposure: f64) {
        self.entries.insert(stamp, exposure);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
