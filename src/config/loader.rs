//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::CatalogueConfig;
use crate::domain::errors::CatalogueError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CatalogueConfig
/// 4. Applies environment variable overrides (CATALOGUE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, TOML parsing fails, a
/// referenced environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use ntuple_catalogue::config::loader::load_config;
///
/// let config = load_config("catalogue.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CatalogueConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CatalogueError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CatalogueError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: CatalogueConfig = toml::from_str(&contents)
        .map_err(|e| CatalogueError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        CatalogueError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Every missing variable is reported in a
/// single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(CatalogueError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the CATALOGUE_* prefix
///
/// Variables follow the pattern CATALOGUE_<SECTION>_<KEY>, for example
/// CATALOGUE_MERGE_JOBS or CATALOGUE_DATABASE_PATH. Unparseable numeric values
/// are ignored.
fn apply_env_overrides(config: &mut CatalogueConfig) {
    if let Ok(val) = std::env::var("CATALOGUE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("CATALOGUE_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    if let Ok(val) = std::env::var("CATALOGUE_WORKFLOW_DOCUMENTS") {
        config.workflow.documents = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
    }

    if let Ok(val) = std::env::var("CATALOGUE_MERGE_EXECUTABLE") {
        config.merge.executable = val;
    }
    if let Ok(val) = std::env::var("CATALOGUE_MERGE_JOBS") {
        if let Ok(jobs) = val.parse() {
            config.merge.jobs = jobs;
        }
    }
    if let Ok(val) = std::env::var("CATALOGUE_MERGE_SCRATCH_DIR") {
        config.merge.scratch_dir = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("CATALOGUE_MERGE_MIN_FREE_GIB") {
        if let Ok(gib) = val.parse() {
            config.merge.min_free_gib = gib;
        }
    }

    if let Ok(val) = std::env::var("CATALOGUE_READER_ROOT_EXECUTABLE") {
        config.reader.root_executable = val;
    }

    if let Ok(val) = std::env::var("CATALOGUE_DATABASE_PATH") {
        config.database.path = PathBuf::from(val);
    }

    if let Ok(val) = std::env::var("CATALOGUE_OUTPUT_CATALOGUE_PATH") {
        config.output.catalogue_path = PathBuf::from(val);
    }

    if let Ok(val) = std::env::var("CATALOGUE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CATALOGUE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
