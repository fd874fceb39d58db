//! Filesystem probes used around the merge step

use std::io;
use std::path::Path;

/// Reports free space available to unprivileged writers
pub trait SpaceProbe: Send + Sync {
    /// Free bytes on the filesystem holding `dir`
    fn free_bytes(&self, dir: &Path) -> io::Result<u64>;
}

/// [`SpaceProbe`] backed by `statvfs(3)`
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

impl SpaceProbe for StatvfsProbe {
    #[cfg(unix)]
    fn free_bytes(&self, dir: &Path) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(dir).map_err(io::Error::from)?;
        Ok((stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64))
    }

    #[cfg(not(unix))]
    fn free_bytes(&self, _dir: &Path) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "free space probing requires statvfs",
        ))
    }
}

/// Whether the current process can create files in `dir`
///
/// Checked by creating an anonymous temporary file there, which is removed
/// as soon as it is dropped.
pub fn is_writable_dir(dir: &Path) -> bool {
    match tempfile::tempfile_in(dir) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(directory = %dir.display(), error = %e, "Directory is not writable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_statvfs_reports_space_for_temp_dir() {
        let dir = TempDir::new().unwrap();
        assert!(StatvfsProbe.free_bytes(dir.path()).is_ok());
    }

    #[test]
    fn test_statvfs_missing_directory_is_an_error() {
        assert!(StatvfsProbe
            .free_bytes(Path::new("/nonexistent/scratch/dir"))
            .is_err());
    }

    #[test]
    fn test_is_writable_dir() {
        let dir = TempDir::new().unwrap();
        assert!(is_writable_dir(dir.path()));
        assert!(!is_writable_dir(Path::new("/nonexistent/output/dir")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_file_is_not_a_writable_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("samples.root");
        std::fs::write(&file, b"x").unwrap();
        assert!(!is_writable_dir(&file));
    }
}
