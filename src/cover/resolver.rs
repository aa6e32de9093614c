//! Cover lookup
//!
//! The read side of the cover cache: the presentation layer asks for a
//! document's thumbnail for a given device profile. The digest is read once
//! at construction; `None` is the defined "no cover" answer.

use std::path::Path;

use crate::fs::{FsNode, NodeId};

use super::error::CoverError;
use super::store::CoverStore;
use super::types::CoverDigest;

/// Resolves documents to generated thumbnail paths
pub struct CoverResolver {
    digest: CoverDigest,
}

impl CoverResolver {
    /// Load the current digest from the store
    pub fn load(store: &CoverStore) -> Result<Self, CoverError> {
        Ok(Self {
            digest: store.read()?,
        })
    }

    /// Wrap an already-loaded digest
    pub fn from_digest(digest: CoverDigest) -> Self {
        Self { digest }
    }

    /// Thumbnail path for a document and device profile
    pub fn resolve(&self, node: &FsNode, device: &str) -> Option<&Path> {
        self.resolve_id(&node.id, device)
    }

    /// Thumbnail path by document identity
    pub fn resolve_id(&self, id: &NodeId, device: &str) -> Option<&Path> {
        self.digest.find(id).and_then(|cover| cover.thumbnail(device))
    }
}
