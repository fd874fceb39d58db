//! Atomic catalogue persistence

use crate::domain::{Catalogue, CatalogueError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode of the persisted catalogue, readable by every consumer
#[cfg(unix)]
const CATALOGUE_MODE: u32 = 0o644;

/// Writes the catalogue as indented JSON, replacing any previous document
///
/// The document is written to a temporary file next to `path` and renamed
/// into place, so readers see either the old catalogue or the new one.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written or renamed.
pub fn write_catalogue(path: &Path, catalogue: &Catalogue) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut file, formatter);
    catalogue.serialize(&mut serializer)?;
    file.write_all(b"\n")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(CATALOGUE_MODE))?;
    }
    file.as_file().sync_all()?;

    file.persist(path).map_err(|e| {
        CatalogueError::Io(format!(
            "Failed to move catalogue into {}: {}",
            path.display(),
            e.error
        ))
    })?;

    tracing::info!(path = %path.display(), entries = catalogue.entry_count(), "Catalogue written");
    Ok(())
}
