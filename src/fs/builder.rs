//! Bounded filesystem traversal
//!
//! Produces a raw [`Tree`] from a root directory: breadth-first, depth
//! limited, symlink-aware, with optional hidden-entry filtering. The tree it
//! returns may still contain empty boundary directories; the normalizer
//! prunes those afterwards.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::LibraryConfig;

use super::error::TreeError;
use super::sniff::{read_sniff_window, MimeSniffer, DOCUMENT_MIME, UNKNOWN_MIME};
use super::types::{FileMeta, NodeKind, NodeRef, Tree};

/// Breadth-first tree builder
///
/// Depth counting starts at 1 for the root's direct children. A file at
/// depth `d` is admitted when `d <= max_depth`; a directory is always
/// admitted as a node but only expanded when `d < max_depth`, so directories
/// sitting exactly on the boundary become empty leaves.
pub struct TreeBuilder<'a> {
    config: &'a LibraryConfig,
    sniffer: &'a dyn MimeSniffer,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(config: &'a LibraryConfig, sniffer: &'a dyn MimeSniffer) -> Self {
        Self { config, sniffer }
    }

    /// Traverse the configured root and build the raw tree
    ///
    /// A missing root, an unreadable root or an unusable configuration fail
    /// the build; permission failures below the root are logged and skipped.
    pub fn build(&self) -> Result<Tree, TreeError> {
        let root = &self.config.root;
        if self.config.max_depth == 0 {
            return Err(TreeError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }

        let root_meta = std::fs::metadata(root).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                TreeError::RootNotFound(root.clone())
            } else {
                TreeError::RootUnreadable {
                    path: root.clone(),
                    source: err,
                }
            }
        })?;
        if !root_meta.is_dir() {
            return Err(TreeError::InvalidConfig(format!(
                "root is not a directory: {}",
                root.display()
            )));
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        if let Ok(real_root) = std::fs::canonicalize(root) {
            visited.insert(real_root);
        }

        let mut tree = Tree::with_root(root);
        // (parent node, directory to scan, depth of its entries)
        let mut queue: VecDeque<(NodeRef, PathBuf, usize)> = VecDeque::new();
        queue.push_back((tree.root(), root.clone(), 1));

        while let Some((parent, dir_path, depth)) = queue.pop_front() {
            let entries = match std::fs::read_dir(&dir_path) {
                Ok(entries) => entries,
                Err(err) if depth == 1 => {
                    return Err(TreeError::RootUnreadable {
                        path: dir_path,
                        source: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        path = %dir_path.display(),
                        error = %err,
                        "Skipping unreadable directory"
                    );
                    continue;
                }
            };

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!(
                            path = %dir_path.display(),
                            error = %err,
                            "Skipping unreadable directory entry"
                        );
                        continue;
                    }
                };
                self.admit_entry(&mut tree, &mut visited, &mut queue, parent, &entry, depth);
            }
        }

        Ok(tree)
    }

    fn admit_entry(
        &self,
        tree: &mut Tree,
        visited: &mut HashSet<PathBuf>,
        queue: &mut VecDeque<(NodeRef, PathBuf, usize)>,
        parent: NodeRef,
        entry: &std::fs::DirEntry,
        depth: usize,
    ) {
        let name = entry.file_name();
        if self.config.ignore_hidden && name.to_string_lossy().starts_with('.') {
            return;
        }
        let entry_path = entry.path();

        let is_symlink = entry
            .file_type()
            .map(|ft| ft.is_symlink())
            .unwrap_or(false);
        if is_symlink && !self.config.follow_symlinks {
            return;
        }

        // Follows symlinks; a dangling link fails here and is skipped.
        let meta = match std::fs::metadata(&entry_path) {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!(
                    path = %entry_path.display(),
                    error = %err,
                    "Skipping unreadable entry"
                );
                return;
            }
        };

        // Cycle and duplicate protection: directories and symlink targets
        // are admitted at most once per traversal, keyed by canonical path.
        let mut scan_path = entry_path.clone();
        if meta.is_dir() || is_symlink {
            let real = match std::fs::canonicalize(&entry_path) {
                Ok(real) => real,
                Err(err) => {
                    tracing::warn!(
                        path = %entry_path.display(),
                        error = %err,
                        "Skipping unresolvable entry"
                    );
                    return;
                }
            };
            if !visited.insert(real.clone()) {
                return;
            }
            if meta.is_dir() {
                scan_path = real;
            }
        }

        if meta.is_file() {
            // Admitted: entries are only enumerated at depth <= max_depth.
            let kind = self.classify(&entry_path, &meta);
            tree.push_child(parent, entry_path, kind);
        } else if meta.is_dir() {
            let node = tree.push_child(parent, entry_path, NodeKind::directory());
            if depth < self.config.max_depth {
                queue.push_back((node, scan_path, depth + 1));
            }
        }
    }

    /// Classify a regular file by sniffing its content
    ///
    /// Never fails: a sniff failure degrades to a generic file with an
    /// unknown content type.
    fn classify(&self, path: &Path, meta: &std::fs::Metadata) -> NodeKind {
        let mime = match read_sniff_window(path) {
            Ok(window) => self.sniffer.sniff(&window),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Content sniffing failed"
                );
                UNKNOWN_MIME.to_string()
            }
        };
        let modified: DateTime<Utc> = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::SystemTime::UNIX_EPOCH));
        let file_meta = FileMeta {
            mime,
            size: meta.len(),
            modified,
        };
        if file_meta.mime == DOCUMENT_MIME {
            NodeKind::Document(file_meta)
        } else {
            NodeKind::File(file_meta)
        }
    }
}
