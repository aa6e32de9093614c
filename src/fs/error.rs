//! Filesystem tree error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or querying the filesystem tree
#[derive(Debug, Error)]
pub enum TreeError {
    /// The configured root directory does not exist
    #[error("Root directory not found: {0}")]
    RootNotFound(PathBuf),

    /// The root directory exists but cannot be listed
    #[error("Cannot read root directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The builder was handed an unusable configuration
    #[error("Invalid tree configuration: {0}")]
    InvalidConfig(String),

    /// A file was expected to be a structured document but carries a
    /// different content type
    #[error("Unsupported media type for {path}: expected '{expected}', got '{mime}'")]
    UnsupportedMediaType {
        path: PathBuf,
        expected: &'static str,
        mime: String,
    },

    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tree operations
pub type TreeResult<T> = std::result::Result<T, TreeError>;
