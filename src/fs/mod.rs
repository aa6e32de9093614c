//! Filesystem tree indexing
//!
//! Builds an in-memory navigable tree from a root directory and answers all
//! path-based queries against it: bounded-depth traversal, symlink and
//! hidden-entry handling, node classification by content sniffing, and a
//! path-safe lookup index.

pub mod builder;
pub mod error;
pub mod normalize;
pub mod sniff;
pub mod tree;
pub mod types;

pub use builder::TreeBuilder;
pub use error::{TreeError, TreeResult};
pub use sniff::{MagicMimeSniffer, MimeSniffer, DOCUMENT_MIME, SNIFF_WINDOW, UNKNOWN_MIME};
pub use tree::{Children, FsTree};
pub use types::{FileMeta, FsNode, NodeId, NodeKind, NodeRef, Tree};
