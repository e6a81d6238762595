//! Result type alias for the engine

use super::errors::EngineError;

/// Result type alias for engine operations
///
/// # Examples
///
/// ```
/// use grantflow::domain::result::Result;
/// use grantflow::domain::errors::EngineError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(EngineError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, EngineError>;
