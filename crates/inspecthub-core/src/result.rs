//! Convenience result type alias for InspectHub.

use crate::error::AppError;

/// A specialized `Result` type for InspectHub operations.
pub type AppResult<T> = Result<T, AppError>;
