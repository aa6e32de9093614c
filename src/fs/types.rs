//! Filesystem node model
//!
//! Nodes live in an arena owned by [`Tree`]; a [`NodeRef`] is an index into
//! that arena. Directories own their children through the arena and the
//! parent link is a plain back-reference, so the tree has single ownership
//! and no reference cycles.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::TreeError;
use super::sniff::DOCUMENT_MIME;

/// Stable node identity derived from an absolute path
///
/// The identity is the lowercase hex SHA-256 of the path bytes. It is
/// deterministic across runs and collision-resistant, and it deliberately
/// does not expose the filesystem layout it was derived from. Renaming or
/// moving a file yields a new identity: identity tracks location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Derive the identity of an absolute path
    pub fn from_path(path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.as_os_str().as_encoded_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex representation, usable as a directory name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a node inside its owning [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub(crate) usize);

/// Metadata shared by files and documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Sniffed content type (never extension-derived)
    pub mime: String,
    /// Size in bytes
    pub size: u64,
    /// Modification timestamp
    pub modified: DateTime<Utc>,
}

/// Node discriminant
///
/// A closed set: consumers match exhaustively instead of downcasting.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Directory with its owned children, in directory-scan order
    Directory { children: Vec<NodeRef> },
    /// Regular file
    File(FileMeta),
    /// Structured document (a file whose content type is [`DOCUMENT_MIME`])
    Document(FileMeta),
}

impl NodeKind {
    /// Checked document constructor
    ///
    /// Fails with [`TreeError::UnsupportedMediaType`] when the sniffed
    /// content type is not the structured-document type.
    pub fn document(path: &Path, meta: FileMeta) -> Result<Self, TreeError> {
        if meta.mime != DOCUMENT_MIME {
            return Err(TreeError::UnsupportedMediaType {
                path: path.to_path_buf(),
                expected: DOCUMENT_MIME,
                mime: meta.mime,
            });
        }
        Ok(Self::Document(meta))
    }

    /// Empty directory
    pub fn directory() -> Self {
        Self::Directory {
            children: Vec::new(),
        }
    }
}

/// A single entry in the filesystem tree
#[derive(Debug, Clone)]
pub struct FsNode {
    /// Stable identity of the absolute path
    pub id: NodeId,
    /// Absolute path on disk
    pub abs_path: PathBuf,
    /// Basename
    pub name: String,
    /// Root-relative path, `""` for the root, `/`-separated
    ///
    /// This is the only path form ever exposed to consumers. It never
    /// contains `..` segments and always points strictly inside the root.
    pub rel_path: String,
    /// Back-reference to the parent directory, `None` for the root
    pub parent: Option<NodeRef>,
    /// Discriminant and kind-specific payload
    pub kind: NodeKind,
}

impl FsNode {
    /// Whether this node is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Whether this node is a file (documents included)
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_) | NodeKind::Document(_))
    }

    /// Whether this node is a structured document
    pub fn is_document(&self) -> bool {
        matches!(self.kind, NodeKind::Document(_))
    }

    /// File metadata, `None` for directories
    pub fn file_meta(&self) -> Option<&FileMeta> {
        match &self.kind {
            NodeKind::File(meta) | NodeKind::Document(meta) => Some(meta),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Child references, empty for non-directories
    pub fn children(&self) -> &[NodeRef] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            _ => &[],
        }
    }
}

/// Arena-backed filesystem tree
///
/// Produced by the builder, post-processed in place by the normalizer and
/// finally wrapped by [`crate::fs::FsTree`] for queries.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<FsNode>,
    root: NodeRef,
}

impl Tree {
    /// Create a tree holding only a root directory node
    pub fn with_root(root_path: &Path) -> Self {
        let root = FsNode {
            id: NodeId::from_path(root_path),
            abs_path: root_path.to_path_buf(),
            name: root_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            rel_path: String::new(),
            parent: None,
            kind: NodeKind::directory(),
        };
        Self {
            nodes: vec![root],
            root: NodeRef(0),
        }
    }

    /// The root directory node
    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// Borrow a node
    pub fn node(&self, r: NodeRef) -> &FsNode {
        &self.nodes[r.0]
    }

    pub(crate) fn node_mut(&mut self, r: NodeRef) -> &mut FsNode {
        &mut self.nodes[r.0]
    }

    /// Append a new child node under `parent`
    ///
    /// The child's name is the basename of `abs_path` and its rel_path is
    /// derived from the parent, upholding the
    /// `rel_path == parent.rel_path + "/" + name` invariant.
    pub(crate) fn push_child(
        &mut self,
        parent: NodeRef,
        abs_path: PathBuf,
        kind: NodeKind,
    ) -> NodeRef {
        debug_assert!(self.node(parent).is_dir(), "parent must be a directory");
        let name = abs_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_rel = &self.node(parent).rel_path;
        let rel_path = if parent_rel.is_empty() {
            name.clone()
        } else {
            format!("{parent_rel}/{name}")
        };
        let node = FsNode {
            id: NodeId::from_path(&abs_path),
            abs_path,
            name,
            rel_path,
            parent: Some(parent),
            kind,
        };
        let r = NodeRef(self.nodes.len());
        self.nodes.push(node);
        if let NodeKind::Directory { children } = &mut self.node_mut(parent).kind {
            children.push(r);
        }
        r
    }

    /// Iterate every node reachable from the root, depth-first
    ///
    /// Iterative with an explicit stack: arbitrary tree depth never risks
    /// stack exhaustion.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Number of nodes reachable from the root
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    /// Whether the tree holds only the root
    pub fn is_empty(&self) -> bool {
        self.node(self.root).children().is_empty()
    }

    /// Collect `rel_path -> node` for every reachable node, root included
    pub(crate) fn index(&self) -> HashMap<String, NodeRef> {
        let mut map = HashMap::new();
        let mut stack = vec![self.root];
        while let Some(r) = stack.pop() {
            let node = self.node(r);
            stack.extend_from_slice(node.children());
            map.insert(node.rel_path.clone(), r);
        }
        map
    }
}

impl Index<NodeRef> for Tree {
    type Output = FsNode;

    fn index(&self, r: NodeRef) -> &FsNode {
        self.node(r)
    }
}

/// Depth-first iterator over reachable node references
pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<NodeRef>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let r = self.stack.pop()?;
        self.stack.extend_from_slice(self.tree.node(r).children());
        Some(r)
    }
}
