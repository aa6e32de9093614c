//! Localshelf core
//!
//! Indexes a directory of documents into an in-memory navigable tree and
//! maintains a derived on-disk thumbnail cache for document cover images.
//! The web layer that presents the library is an external consumer of the
//! two interfaces exposed here.
//!
//! # Modules
//!
//! - `fs`: filesystem tree indexing (traversal, normalization, path-safe
//!   lookup)
//! - `cover`: cover cache (digest persistence, thumbnail generation, lookup)
//! - `config`: plain configuration data
//! - `context`: explicit dependency-injection context

pub mod config;
pub mod context;
pub mod cover;
pub mod fs;

pub use config::{CoverConfig, LibraryConfig};
pub use context::LibraryContext;
pub use cover::{CoverGenerator, CoverResolver, CoverStore, DeviceProfile, PageRenderer};
pub use fs::{FsNode, FsTree, MagicMimeSniffer, MimeSniffer, NodeId, NodeKind};
