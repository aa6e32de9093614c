//! Persisted cover cache records

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fs::NodeId;

/// One document's cover cache entry
///
/// Created during generation, persisted in the digest, read back on the next
/// run and discarded once its source document disappears from the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverInfo {
    /// Document identity; also the bucket directory name
    pub id: NodeId,
    /// Absolute path of the source document
    pub original: PathBuf,
    /// Profile name -> generated thumbnail path
    pub thumbnails: HashMap<String, PathBuf>,
    /// Source modification time at generation
    pub modified: DateTime<Utc>,
}

impl CoverInfo {
    /// Thumbnail path for a device profile, if one was generated
    pub fn thumbnail(&self, device: &str) -> Option<&Path> {
        self.thumbnails.get(device).map(PathBuf::as_path)
    }
}

/// The persisted digest: the whole cover cache state in one artifact
///
/// Rewritten wholesale on every successful generation pass, never appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverDigest {
    /// All current entries
    pub covers: Vec<CoverInfo>,
    /// When this digest was written
    pub timestamp: DateTime<Utc>,
    /// Entry count, redundant with `covers.len()` but persisted for
    /// at-a-glance inspection of the artifact
    pub count: usize,
}

impl CoverDigest {
    pub fn new(covers: Vec<CoverInfo>) -> Self {
        let count = covers.len();
        Self {
            covers,
            timestamp: Utc::now(),
            count,
        }
    }

    /// Find an entry by document identity
    pub fn find(&self, id: &NodeId) -> Option<&CoverInfo> {
        self.covers.iter().find(|cover| &cover.id == id)
    }
}
