//! Library context
//!
//! One explicit context object wires the injected dependencies (content
//! sniffer, page renderer) to the configuration and hands out the core
//! components. Constructed once at process start and passed around by
//! reference; there is no ambient global state.

use std::sync::Arc;

use crate::config::{CoverConfig, LibraryConfig};
use crate::cover::{CoverGenerator, CoverResolver, CoverStore, PageRenderer};
use crate::fs::{FsTree, MimeSniffer, TreeError};

/// Shared library context
#[derive(Clone)]
pub struct LibraryContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    library: LibraryConfig,
    covers: CoverConfig,
    sniffer: Box<dyn MimeSniffer>,
    renderer: Arc<dyn PageRenderer>,
}

impl LibraryContext {
    pub fn new(
        library: LibraryConfig,
        covers: CoverConfig,
        sniffer: impl MimeSniffer + 'static,
        renderer: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                library,
                covers,
                sniffer: Box::new(sniffer),
                renderer,
            }),
        }
    }

    /// Tree indexing configuration
    pub fn library(&self) -> &LibraryConfig {
        &self.inner.library
    }

    /// Cover cache configuration
    pub fn covers(&self) -> &CoverConfig {
        &self.inner.covers
    }

    /// The injected content sniffer
    pub fn sniffer(&self) -> &dyn MimeSniffer {
        self.inner.sniffer.as_ref()
    }

    /// The injected page renderer
    pub fn renderer(&self) -> Arc<dyn PageRenderer> {
        Arc::clone(&self.inner.renderer)
    }

    /// Build, normalize and index the configured library root
    pub fn build_tree(&self) -> Result<FsTree, TreeError> {
        FsTree::build(self.library(), self.sniffer())
    }

    /// Cover generator wired to this context's configuration and renderer
    pub fn cover_generator(&self) -> CoverGenerator {
        CoverGenerator::new(self.covers(), self.renderer())
    }

    /// Digest store for this context's cover configuration
    pub fn cover_store(&self) -> CoverStore {
        CoverStore::new(&self.covers().digest_file)
    }

    /// Resolver over the currently persisted digest
    pub fn cover_resolver(&self) -> Result<CoverResolver, crate::cover::CoverError> {
        CoverResolver::load(&self.cover_store())
    }
}
