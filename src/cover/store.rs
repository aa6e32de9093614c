//! Digest persistence
//!
//! The digest is a single JSON artifact holding every current cover entry
//! plus a generation timestamp and count. Each successful generation pass
//! overwrites it wholesale.

use std::path::{Path, PathBuf};

use super::error::CoverError;
use super::types::{CoverDigest, CoverInfo};

/// Reads and writes the digest file
#[derive(Debug, Clone)]
pub struct CoverStore {
    path: PathBuf,
}

impl CoverStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the digest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the digest with the given entries
    ///
    /// Creates the containing directory if it does not exist yet.
    pub fn save(&self, covers: &[CoverInfo]) -> Result<(), CoverError> {
        let digest = CoverDigest::new(covers.to_vec());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&digest)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Load the current digest
    ///
    /// Fails with [`CoverError::DigestNotFound`] when no digest has been
    /// written yet.
    pub fn read(&self) -> Result<CoverDigest, CoverError> {
        if !self.path.exists() {
            return Err(CoverError::DigestNotFound(self.path.clone()));
        }
        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Remove the digest file if present
    pub fn clear(&self) -> Result<(), CoverError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
