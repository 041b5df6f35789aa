//! Error types for agrox-store.

use std::path::PathBuf;

/// Result type for agrox-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in agrox-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create an archive directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Timestamp could not be formatted.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] time::error::Format),

    /// A requested file name is not a plain file name.
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// Requested file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
