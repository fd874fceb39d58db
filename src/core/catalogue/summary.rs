//! Build summary and reporting
//!
//! Dropped entries are counted and kept with their reason so a build that
//! finished with gaps in the catalogue can be told apart from a clean one.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// A recipe entry left out of the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEntry {
    /// `beamline/run/sample[/variation]`
    pub path: String,

    /// Why the entry was dropped
    pub reason: String,
}

impl DroppedEntry {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Summary of one catalogue build
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    /// Active beamlines walked
    pub beamlines_processed: usize,

    /// Beamlines skipped because they are inactive
    pub beamlines_skipped: usize,

    /// Runs with at least one sample
    pub runs_processed: usize,

    /// Runs skipped because they have no samples
    pub runs_skipped: usize,

    /// Entries written to the catalogue, detector variations included
    pub entries_annotated: usize,

    /// Inactive entries
    pub entries_skipped: usize,

    /// Entries that failed and were left out
    pub dropped: Vec<DroppedEntry>,

    /// Where the catalogue was written, unset for dry runs
    pub catalogue_path: Option<PathBuf>,

    /// When the build started
    pub started_at: DateTime<Utc>,

    /// Duration of the build
    pub duration: Duration,
}

impl BuildSummary {
    /// Create a new empty build summary
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Self::default()
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record an entry that was left out of the catalogue
    pub fn add_dropped(&mut self, entry: DroppedEntry) {
        self.dropped.push(entry);
    }

    pub fn entries_dropped(&self) -> usize {
        self.dropped.len()
    }

    /// True when every active entry made it into the catalogue
    pub fn is_successful(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            beamlines = self.beamlines_processed,
            beamlines_skipped = self.beamlines_skipped,
            runs = self.runs_processed,
            runs_skipped = self.runs_skipped,
            annotated = self.entries_annotated,
            skipped = self.entries_skipped,
            dropped = self.entries_dropped(),
            started_at = %self.started_at.to_rfc3339(),
            duration_secs = self.duration.as_secs(),
            catalogue = %self
                .catalogue_path
                .as_ref()
                .map_or_else(|| "<not written>".to_string(), |p| p.display().to_string()),
            "Catalogue build completed"
        );

        if !self.dropped.is_empty() {
            tracing::warn!(
                dropped = self.dropped.len(),
                "Catalogue build completed with dropped entries"
            );
            for entry in &self.dropped {
                tracing::warn!(entry = %entry.path, reason = %entry.reason, "Dropped entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_summary_creation() {
        let summary = BuildSummary::new();

        assert_eq!(summary.beamlines_processed, 0);
        assert_eq!(summary.entries_annotated, 0);
        assert_eq!(summary.entries_dropped(), 0);
        assert_eq!(summary.duration, Duration::from_secs(0));
        assert!(summary.catalogue_path.is_none());
        assert!(summary.is_successful());
        assert!(summary.started_at <= Utc::now());
    }

    #[test]
    fn test_build_summary_with_duration() {
        let summary = BuildSummary::new().with_duration(Duration::from_secs(90));
        assert_eq!(summary.duration, Duration::from_secs(90));
    }

    #[test]
    fn test_dropped_entries_make_build_unsuccessful() {
        let mut summary = BuildSummary::new();
        summary.entries_annotated = 3;
        assert!(summary.is_successful());

        summary.add_dropped(DroppedEntry::new(
            "numi_fhc/run1/beam_on",
            "Stage 'reco_beam' not found in workflow outdirs",
        ));
        assert!(!summary.is_successful());
        assert_eq!(summary.entries_dropped(), 1);
        assert_eq!(summary.dropped[0].path, "numi_fhc/run1/beam_on");
    }
}
