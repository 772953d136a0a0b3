//! Error types for the grid engine.
//!
//! Data problems (missing group properties, unparsable cells, unknown row
//! ids) never surface here; the engine recovers from those silently. Errors
//! are reserved for callers naming things that do not exist and for malformed
//! configuration.

use crate::tree::GroupId;

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors that can occur in the grid engine.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// No column with this id is configured.
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// The column exists but has sorting disabled.
    #[error("Column '{0}' cannot be sorted")]
    ColumnNotSortable(String),

    /// No group with this id exists in the current tree.
    #[error("Unknown group {0}")]
    UnknownGroup(GroupId),

    /// Configuration could not be parsed.
    #[error("Invalid grid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A core primitive reported an error.
    #[error(transparent)]
    Core(#[from] horizon_grid_core::CoreError),
}

impl GridError {
    /// Create an unknown column error.
    pub fn unknown_column(id: impl Into<String>) -> Self {
        Self::UnknownColumn(id.into())
    }
}
