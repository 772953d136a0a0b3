//! Error types for Horizon Grid core systems.

use crate::task::TaskId;

/// A specialized Result type for Horizon Grid core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The task ID is unknown, or the task has already run.
    #[error("Invalid or completed task ID {0:?}")]
    InvalidTask(TaskId),
}
