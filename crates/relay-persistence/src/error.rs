//! Error types for persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing state files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading a state file failed.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Writing a state file failed.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Creating the state directory failed.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file exists but is not the expected JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
