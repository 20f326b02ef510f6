//! Convenience result type alias for DocRoute.

use crate::error::AppError;

/// A specialized `Result` type for DocRoute operations.
pub type AppResult<T> = Result<T, AppError>;
