//! Result type alias for rowship
//!
//! This module provides a convenient Result type alias that uses RowshipError
//! as the error type.

use super::errors::RowshipError;

/// Result type alias for rowship operations
///
/// # Examples
///
/// ```
/// use rowship::domain::result::Result;
/// use rowship::domain::errors::RowshipError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(RowshipError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, RowshipError>;
