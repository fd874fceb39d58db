//! Result type alias for the catalogue builder

use super::errors::CatalogueError;

/// Result type alias for catalogue operations
///
/// # Examples
///
/// ```
/// use ntuple_catalogue::domain::result::Result;
/// use ntuple_catalogue::domain::errors::CatalogueError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CatalogueError::Recipe("role must be 'recipe'".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CatalogueError>;
