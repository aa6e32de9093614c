//! Indexed filesystem tree
//!
//! [`FsTree`] wraps a normalized [`Tree`] with a flat map from rel_path to
//! node for O(1) lookup. All externally reachable queries go through it; the
//! lookup path is also where path-traversal attempts are stopped.

use std::collections::HashMap;
use std::path::{Component, Path};

use crate::config::LibraryConfig;

use super::builder::TreeBuilder;
use super::error::TreeError;
use super::normalize;
use super::sniff::MimeSniffer;
use super::types::{FsNode, NodeRef, Tree};

/// Queryable, indexed filesystem tree
pub struct FsTree {
    tree: Tree,
    index: HashMap<String, NodeRef>,
}

impl FsTree {
    /// Build, normalize and index the configured root in one pass
    pub fn build(config: &LibraryConfig, sniffer: &dyn MimeSniffer) -> Result<Self, TreeError> {
        let mut tree = TreeBuilder::new(config, sniffer).build()?;
        normalize::normalize(&mut tree, config.max_depth);
        Ok(Self::from_tree(tree))
    }

    /// Index an already-normalized tree
    ///
    /// Every reachable node is recorded, the root under the key `""`.
    pub fn from_tree(tree: Tree) -> Self {
        let index = tree.index();
        Self { tree, index }
    }

    /// The root directory node
    pub fn root(&self) -> &FsNode {
        self.tree.node(self.tree.root())
    }

    /// Borrow a node by reference token
    pub fn node(&self, r: NodeRef) -> &FsNode {
        self.tree.node(r)
    }

    /// Number of indexed nodes, root included
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the tree holds only the root
    pub fn is_empty(&self) -> bool {
        self.index.len() <= 1
    }

    /// Look up a node by root-relative path
    ///
    /// The request is lexically normalized before the lookup; any request
    /// that would escape the root fails closed and is indistinguishable from
    /// not-found.
    pub fn get(&self, path: &str) -> Option<&FsNode> {
        self.get_ref(path).map(|r| self.tree.node(r))
    }

    /// Like [`FsTree::get`], returning the reference token
    pub fn get_ref(&self, path: &str) -> Option<NodeRef> {
        let normalized = normalize_request(path)?;
        self.index.get(&normalized).copied()
    }

    /// Express an absolute path relative to the indexed root
    pub fn root_relative(&self, abs: &Path) -> Option<String> {
        let rel = abs.strip_prefix(&self.root().abs_path).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    /// Enumerate nodes below a directory, lazily and depth-first
    ///
    /// `dir` defaults to the root; the start directory itself is never
    /// yielded. With `recursive` the walk descends into subdirectories;
    /// `include_dirs = false` suppresses directory nodes from the output
    /// while still descending through them.
    pub fn children(
        &self,
        dir: Option<NodeRef>,
        recursive: bool,
        include_dirs: bool,
    ) -> Children<'_> {
        let start = dir.unwrap_or_else(|| self.tree.root());
        let mut stack: Vec<NodeRef> = self.tree.node(start).children().to_vec();
        stack.reverse();
        Children {
            tree: &self.tree,
            stack,
            recursive,
            include_dirs,
        }
    }

    /// All structured documents in the tree
    pub fn documents(&self) -> impl Iterator<Item = &FsNode> {
        self.children(None, true, false)
            .filter(|node| node.is_document())
    }
}

/// Lazy depth-first iterator over tree nodes
pub struct Children<'a> {
    tree: &'a Tree,
    stack: Vec<NodeRef>,
    recursive: bool,
    include_dirs: bool,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a FsNode;

    fn next(&mut self) -> Option<&'a FsNode> {
        loop {
            let r = self.stack.pop()?;
            let node = self.tree.node(r);
            if node.is_dir() {
                if self.recursive {
                    for child in node.children().iter().rev() {
                        self.stack.push(*child);
                    }
                }
                if self.include_dirs {
                    return Some(node);
                }
                continue;
            }
            return Some(node);
        }
    }
}

/// Lexically normalize a lookup request
///
/// Collapses `.` and `..`, and fails on anything that would leave the root:
/// absolute paths, drive prefixes, or more `..` segments than there are
/// parents. Runs before any index access so real paths are never disclosed.
fn normalize_request(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::sniff::MagicMimeSniffer;
    use std::path::Path;

    const PDF_STUB: &[u8] = b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\ntrailer\n<< >>\n%%EOF\n";

    fn write_file(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn sample_library(root: &Path) {
        write_file(root, "dir1/file1.txt", b"file1");
        write_file(root, "dir2/file2.txt", b"file2");
        write_file(root, "dir3/dir4/file3.pdf", PDF_STUB);
        write_file(root, "file4.txt", b"file4");
    }

    fn build(config: LibraryConfig) -> FsTree {
        FsTree::build(&config, &MagicMimeSniffer).unwrap()
    }

    #[test]
    fn test_normalize_request() {
        assert_eq!(normalize_request("a/b/c"), Some("a/b/c".to_string()));
        assert_eq!(normalize_request("a/./b"), Some("a/b".to_string()));
        assert_eq!(normalize_request("a/x/../b"), Some("a/b".to_string()));
        assert_eq!(normalize_request(""), Some(String::new()));
        assert_eq!(normalize_request("a/.."), Some(String::new()));
        assert_eq!(normalize_request("../x"), None);
        assert_eq!(normalize_request("a/../../x"), None);
        assert_eq!(normalize_request("/etc/passwd"), None);
    }

    #[test]
    fn test_get_node() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()));

        for path in [
            "dir1",
            "dir1/file1.txt",
            "dir2/file2.txt",
            "dir3/dir4/file3.pdf",
            "file4.txt",
        ] {
            assert!(tree.get(path).is_some(), "missing {path}");
        }
        assert!(tree.get("nope").is_none());
        assert_eq!(tree.get("").unwrap().rel_path, "");
    }

    #[test]
    fn test_get_fails_closed_on_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        std::fs::create_dir(&root).unwrap();
        sample_library(&root);
        // A sibling of the root that a traversal would reach
        write_file(dir.path(), "outside.txt", b"secret");
        let tree = build(LibraryConfig::new(&root));

        assert!(tree.get("../outside.txt").is_none());
        assert!(tree.get("dir1/../../outside.txt").is_none());
        assert!(tree.get("/outside.txt").is_none());
        // Normalizing inside the root still resolves
        assert!(tree.get("dir1/../file4.txt").is_some());
    }

    #[test]
    fn test_parent_links() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()));

        for (parent, child) in [
            ("dir1", "dir1/file1.txt"),
            ("dir2", "dir2/file2.txt"),
            ("dir3", "dir3/dir4"),
            ("dir3/dir4", "dir3/dir4/file3.pdf"),
        ] {
            let child_node = tree.get(child).unwrap();
            let parent_ref = child_node.parent.unwrap();
            assert_eq!(tree.node(parent_ref).rel_path, parent);
            assert_eq!(
                child_node.rel_path,
                format!("{}/{}", tree.node(parent_ref).rel_path, child_node.name)
            );
        }
    }

    #[test]
    fn test_children_modes() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()));

        // Direct children of the root
        let direct: Vec<_> = tree
            .children(None, false, true)
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(direct.len(), 4);

        // Direct, files only
        let direct_files: Vec<_> = tree
            .children(None, false, false)
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(direct_files, vec!["file4.txt"]);

        // Recursive, everything: 8 nodes, root excluded
        assert_eq!(tree.children(None, true, true).count(), 8);

        // Recursive without directories still descends through them
        let files: Vec<_> = tree
            .children(None, true, false)
            .map(|n| n.rel_path.clone())
            .collect();
        assert_eq!(files.len(), 4);
        assert!(files.contains(&"dir3/dir4/file3.pdf".to_string()));

        // Scoped to a subdirectory
        let dir3 = tree.get_ref("dir3").unwrap();
        let scoped: Vec<_> = tree
            .children(Some(dir3), true, false)
            .map(|n| n.rel_path.clone())
            .collect();
        assert_eq!(scoped, vec!["dir3/dir4/file3.pdf"]);
    }

    #[test]
    fn test_documents() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()));

        let docs: Vec<_> = tree.documents().map(|n| n.rel_path.clone()).collect();
        assert_eq!(docs, vec!["dir3/dir4/file3.pdf"]);
    }

    #[test]
    fn test_depth_limit_prunes_unexpanded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()).with_max_depth(1));

        // Boundary directories were left as empty leaves and then eliminated
        assert!(tree.get("dir1").is_none());
        let file = tree.get("file4.txt").unwrap();
        assert!(file.is_file());
        assert_eq!(tree.len(), 2); // root + file4.txt
    }

    #[test]
    fn test_root_relative() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()));

        let abs = dir.path().join("dir1/file1.txt");
        assert_eq!(tree.root_relative(&abs), Some("dir1/file1.txt".to_string()));
        assert_eq!(tree.root_relative(Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn test_rel_path_invariant_holds_for_all_nodes() {
        let dir = tempfile::tempdir().unwrap();
        sample_library(dir.path());
        let tree = build(LibraryConfig::new(dir.path()));

        for node in tree.children(None, true, true) {
            assert!(!node.rel_path.contains(".."));
            let parent = tree.node(node.parent.unwrap());
            let expected = if parent.rel_path.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", parent.rel_path, node.name)
            };
            assert_eq!(node.rel_path, expected);
        }
    }
}
