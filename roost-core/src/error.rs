//! Error types for Roost

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Roost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Roost operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Path does not exist or is not a repository root
    #[error("Invalid repository path {}: {reason}", path.display())]
    PathInvalid { path: PathBuf, reason: String },

    /// Group create/rename collides with an existing name or "All"
    #[error("A group named '{0}' already exists")]
    DuplicateName(String),

    /// Referenced group does not exist
    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    /// Operation is not allowed on the synthetic "All" group
    #[error("Group '{0}' cannot be modified")]
    ProtectedGroup(String),

    /// Empty or otherwise unusable name
    #[error("Invalid name: '{0}'")]
    InvalidName(String),

    /// Failure reported by git for a single checkout
    #[error("{0}")]
    GitOperation(String),

    /// Malformed persisted settings
    #[error("Failed to parse '{key}': {message}")]
    ConfigParse { key: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::GitOperation(err.message().to_string())
    }
}
