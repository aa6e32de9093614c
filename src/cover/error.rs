//! Cover cache error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the cover cache and generation pipeline
#[derive(Debug, Error)]
pub enum CoverError {
    /// No digest has been written yet (first run)
    #[error("Cover digest not found: {0}")]
    DigestNotFound(PathBuf),

    /// The injected renderer failed on a document page
    #[error("Render error for {path}: {message}")]
    Render { path: PathBuf, message: String },

    /// Thumbnail resizing or encoding failed
    #[error("Image error: {0}")]
    Image(String),

    /// A generation task could not be joined
    #[error("Task join error: {0}")]
    Join(String),

    /// Digest serialization error
    #[error("Digest error: {0}")]
    Digest(#[from] serde_json::Error),

    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cover operations
pub type CoverResult<T> = std::result::Result<T, CoverError>;
