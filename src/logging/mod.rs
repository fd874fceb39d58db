//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logs with rotation
//!
//! Dropped catalogue entries are only discoverable through the log stream, so
//! every drop goes through [`log_sample_dropped!`](crate::log_sample_dropped).
//!
//! # Example
//!
//! ```no_run
//! use ntuple_catalogue::logging::init_logging;
//! use ntuple_catalogue::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Catalogue build started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of processing for one recipe entry
///
/// # Example
///
/// ```no_run
/// use ntuple_catalogue::log_sample_start;
///
/// log_sample_start!("numi_fhc:run1", "beam_on", "reco_beam", false);
/// ```
#[macro_export]
macro_rules! log_sample_start {
    ($scope:expr, $sample_key:expr, $stage_name:expr, $is_detvar:expr) => {
        tracing::info!(
            scope = %$scope,
            sample_key = %$sample_key,
            stage = %$stage_name,
            detector_variation = $is_detvar,
            "Processing entry"
        );
    };
}

/// Log a recipe entry that was dropped from the catalogue
///
/// # Example
///
/// ```no_run
/// use ntuple_catalogue::log_sample_dropped;
///
/// log_sample_dropped!("numi_fhc:run1", "beam_on", "Stage 'reco' not found");
/// ```
#[macro_export]
macro_rules! log_sample_dropped {
    ($scope:expr, $sample_key:expr, $reason:expr) => {
        tracing::error!(
            scope = %$scope,
            sample_key = %$sample_key,
            reason = %$reason,
            "Entry dropped from catalogue"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use ntuple_catalogue::log_error_with_context;
/// use ntuple_catalogue::domain::CatalogueError;
///
/// let error = CatalogueError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
