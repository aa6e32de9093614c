//! Cover generation pipeline
//!
//! Renders the first page of every document in the tree into one thumbnail
//! per device profile, reconciling against the persisted digest so unchanged
//! documents are never re-rendered. Rendering is CPU-bound and runs on the
//! blocking thread pool, one task per document; every task writes only
//! inside its own identity-named bucket, and the digest is written exactly
//! once, after all tasks have joined.

use std::collections::{HashMap, HashSet};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::CoverConfig;
use crate::fs::{FsTree, NodeId};

use super::error::CoverError;
use super::profile::{DeviceProfile, ImageOutputFormat};
use super::render::PageRenderer;
use super::store::CoverStore;
use super::types::CoverInfo;

/// Everything a generation task needs to know about one document
#[derive(Debug, Clone)]
struct DocumentRecord {
    id: NodeId,
    path: PathBuf,
    modified: DateTime<Utc>,
}

/// Multi-profile thumbnail generator with cache reconciliation
pub struct CoverGenerator {
    cover_dir: PathBuf,
    profiles: Vec<DeviceProfile>,
    store: CoverStore,
    renderer: Arc<dyn PageRenderer>,
}

impl CoverGenerator {
    pub fn new(config: &CoverConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            cover_dir: config.cover_dir.clone(),
            profiles: config.profiles.clone(),
            store: CoverStore::new(&config.digest_file),
            renderer,
        }
    }

    /// The digest store this generator writes to
    pub fn store(&self) -> &CoverStore {
        &self.store
    }

    /// Run a generation pass over the tree's documents
    ///
    /// A failing pass resets the entire cover directory and digest, then
    /// retries once from scratch; a second failure is returned to the
    /// caller.
    pub async fn generate(&self, tree: &FsTree, use_cache: bool) -> Result<(), CoverError> {
        match self.generate_pass(tree, use_cache).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Cover generation failed, resetting cache and retrying"
                );
                self.reset()?;
                self.generate_pass(tree, false).await
            }
        }
    }

    async fn generate_pass(&self, tree: &FsTree, use_cache: bool) -> Result<(), CoverError> {
        // Absence (or unreadability) of a prior digest means "no cache".
        let prior = self.store.read().ok();

        let documents: Vec<DocumentRecord> = tree
            .documents()
            .filter_map(|node| {
                node.file_meta().map(|meta| DocumentRecord {
                    id: node.id.clone(),
                    path: node.abs_path.clone(),
                    modified: meta.modified,
                })
            })
            .collect();

        std::fs::create_dir_all(&self.cover_dir)?;

        let mut reused: Vec<CoverInfo> = Vec::new();
        let mut to_generate: Vec<DocumentRecord> = Vec::new();

        if let (true, Some(prior)) = (use_cache, prior) {
            let cached: HashMap<&Path, &CoverInfo> = prior
                .covers
                .iter()
                .map(|cover| (cover.original.as_path(), cover))
                .collect();
            let current: HashSet<&Path> = documents.iter().map(|d| d.path.as_path()).collect();

            // Entries whose source document vanished lose their bucket.
            for cover in &prior.covers {
                if !current.contains(cover.original.as_path()) {
                    let bucket = self.cover_dir.join(cover.id.as_str());
                    if bucket.exists() {
                        std::fs::remove_dir_all(&bucket)?;
                    }
                    tracing::debug!(
                        original = %cover.original.display(),
                        id = %cover.id,
                        "Evicted orphaned cover bucket"
                    );
                }
            }

            for doc in documents {
                match cached.get(doc.path.as_path()) {
                    Some(cover) if cover.modified == doc.modified => {
                        reused.push((*cover).clone());
                    }
                    _ => to_generate.push(doc),
                }
            }
        } else {
            to_generate = documents;
        }

        let generated = to_generate.len();
        let tasks: Vec<_> = to_generate
            .into_iter()
            .map(|doc| {
                let renderer = Arc::clone(&self.renderer);
                let cover_dir = self.cover_dir.clone();
                let profiles = self.profiles.clone();
                tokio::task::spawn_blocking(move || {
                    generate_cover(renderer.as_ref(), &cover_dir, &profiles, &doc)
                })
            })
            .collect();

        // Barrier: the digest has exactly one writer and it runs after every
        // generation task for this pass has completed.
        let results = futures::future::join_all(tasks).await;
        let mut covers = reused;
        for result in results {
            covers.push(result.map_err(|err| CoverError::Join(err.to_string()))??);
        }

        self.store.save(&covers)?;
        tracing::info!(
            total = covers.len(),
            generated,
            "Cover generation pass complete"
        );
        Ok(())
    }

    /// Full-reset recovery: drop every thumbnail and the digest
    fn reset(&self) -> Result<(), CoverError> {
        if self.cover_dir.exists() {
            std::fs::remove_dir_all(&self.cover_dir)?;
        }
        std::fs::create_dir_all(&self.cover_dir)?;
        self.store.clear()
    }
}

/// Render and write all profile thumbnails for one document
fn generate_cover(
    renderer: &dyn PageRenderer,
    cover_dir: &Path,
    profiles: &[DeviceProfile],
    doc: &DocumentRecord,
) -> Result<CoverInfo, CoverError> {
    let bucket = cover_dir.join(doc.id.as_str());
    std::fs::create_dir_all(&bucket)?;

    let mut thumbnails = HashMap::with_capacity(profiles.len());
    for profile in profiles {
        let page = renderer.render_page(&doc.path, 1, profile.dpi)?;
        let thumbnail = page.resize_exact(profile.width, profile.height, FilterType::Lanczos3);
        let out_path = bucket.join(profile.file_name());
        write_thumbnail(&thumbnail, &out_path, profile)?;
        thumbnails.insert(profile.device.clone(), out_path);
    }

    Ok(CoverInfo {
        id: doc.id.clone(),
        original: doc.path.clone(),
        thumbnails,
        modified: doc.modified,
    })
}

fn write_thumbnail(
    image: &DynamicImage,
    path: &Path,
    profile: &DeviceProfile,
) -> Result<(), CoverError> {
    match profile.format {
        ImageOutputFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), profile.quality);
            image
                .to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|err| CoverError::Image(err.to_string()))?;
        }
        ImageOutputFormat::Png => {
            image
                .save_with_format(path, image::ImageFormat::Png)
                .map_err(|err| CoverError::Image(err.to_string()))?;
        }
        ImageOutputFormat::Webp => {
            image
                .save_with_format(path, image::ImageFormat::WebP)
                .map_err(|err| CoverError::Image(err.to_string()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryConfig;
    use crate::fs::MagicMimeSniffer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PDF_STUB: &[u8] = b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\ntrailer\n<< >>\n%%EOF\n";

    /// Renderer stub that counts calls and can fail a configured number of
    /// times before succeeding
    struct StubRenderer {
        calls: AtomicUsize,
        failures_left: AtomicUsize,
    }

    impl StubRenderer {
        fn new() -> Self {
            Self::failing(0)
        }

        fn failing(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(failures),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PageRenderer for StubRenderer {
        fn render_page(
            &self,
            path: &Path,
            _page: u32,
            _dpi: u32,
        ) -> Result<DynamicImage, CoverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failures = self.failures_left.load(Ordering::SeqCst);
            if failures > 0 {
                self.failures_left.store(failures - 1, Ordering::SeqCst);
                return Err(CoverError::Render {
                    path: path.to_path_buf(),
                    message: "stub failure".to_string(),
                });
            }
            Ok(DynamicImage::new_rgb8(640, 900))
        }
    }

    struct Fixture {
        _library: tempfile::TempDir,
        cache: tempfile::TempDir,
        config: LibraryConfig,
        covers: CoverConfig,
    }

    fn fixture(documents: &[&str]) -> Fixture {
        let library = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        for name in documents {
            std::fs::write(library.path().join(name), PDF_STUB).unwrap();
        }
        let config = LibraryConfig::new(library.path());
        let covers = CoverConfig::new(cache.path().join("covers")).with_profiles(vec![
            DeviceProfile::jpeg("desktop", 170, 240),
            DeviceProfile::jpeg("mobile", 120, 170),
        ]);
        Fixture {
            _library: library,
            cache,
            config,
            covers,
        }
    }

    fn tree(fixture: &Fixture) -> FsTree {
        FsTree::build(&fixture.config, &MagicMimeSniffer).unwrap()
    }

    #[tokio::test]
    async fn test_generate_writes_bucket_and_digest() {
        let fx = fixture(&["a.pdf"]);
        let renderer = Arc::new(StubRenderer::new());
        let generator = CoverGenerator::new(&fx.covers, renderer.clone());

        generator.generate(&tree(&fx), false).await.unwrap();

        let digest = generator.store().read().unwrap();
        assert_eq!(digest.count, 1);
        let cover = &digest.covers[0];
        assert_eq!(cover.thumbnails.len(), 2);

        let bucket = fx.covers.cover_dir.join(cover.id.as_str());
        let mut files: Vec<_> = std::fs::read_dir(&bucket)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["desktop.jpeg", "mobile.jpeg"]);
        // One render per profile
        assert_eq!(renderer.calls(), 2);
    }

    #[tokio::test]
    async fn test_generate_with_cache_is_idempotent() {
        let fx = fixture(&["a.pdf", "b.pdf"]);
        let renderer = Arc::new(StubRenderer::new());
        let generator = CoverGenerator::new(&fx.covers, renderer.clone());
        let tree = tree(&fx);

        generator.generate(&tree, true).await.unwrap();
        let after_first = renderer.calls();
        assert_eq!(after_first, 4); // 2 documents x 2 profiles

        let first_digest = generator.store().read().unwrap();
        generator.generate(&tree, true).await.unwrap();

        // Nothing changed on disk: no re-rendering, entries carried over
        assert_eq!(renderer.calls(), after_first);
        let second_digest = generator.store().read().unwrap();
        assert_eq!(second_digest.covers, first_digest.covers);
    }

    #[tokio::test]
    async fn test_modified_document_is_regenerated() {
        let fx = fixture(&["a.pdf"]);
        let renderer = Arc::new(StubRenderer::new());
        let generator = CoverGenerator::new(&fx.covers, renderer.clone());

        generator.generate(&tree(&fx), true).await.unwrap();
        assert_eq!(renderer.calls(), 2);

        // Rewrite the source; the new mtime invalidates the cache entry
        let source = fx.config.root.join("a.pdf");
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(&source, PDF_STUB).unwrap();

        generator.generate(&tree(&fx), true).await.unwrap();
        assert_eq!(renderer.calls(), 4);
    }

    #[tokio::test]
    async fn test_orphan_eviction() {
        let fx = fixture(&["a.pdf", "b.pdf"]);
        let renderer = Arc::new(StubRenderer::new());
        let generator = CoverGenerator::new(&fx.covers, renderer.clone());

        generator.generate(&tree(&fx), true).await.unwrap();
        let digest = generator.store().read().unwrap();
        assert_eq!(digest.count, 2);

        let removed = fx.config.root.join("b.pdf");
        let removed_id = NodeId::from_path(&removed);
        std::fs::remove_file(&removed).unwrap();

        generator.generate(&tree(&fx), true).await.unwrap();

        let digest = generator.store().read().unwrap();
        assert_eq!(digest.count, 1);
        assert!(digest.find(&removed_id).is_none());
        assert!(!fx.covers.cover_dir.join(removed_id.as_str()).exists());
        // The surviving document was reused, not re-rendered
        assert_eq!(renderer.calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_pass_resets_and_retries() {
        let fx = fixture(&["a.pdf"]);
        // Fail the first render, succeed afterwards
        let renderer = Arc::new(StubRenderer::failing(1));
        let generator = CoverGenerator::new(&fx.covers, renderer.clone());

        generator.generate(&tree(&fx), true).await.unwrap();

        let digest = generator.store().read().unwrap();
        assert_eq!(digest.count, 1);
        assert_eq!(digest.covers[0].thumbnails.len(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_is_fatal() {
        let fx = fixture(&["a.pdf"]);
        let renderer = Arc::new(StubRenderer::failing(usize::MAX));
        let generator = CoverGenerator::new(&fx.covers, renderer.clone());

        let err = generator
            .generate(&tree(&fx), true)
            .await
            .expect_err("a renderer that always fails must surface an error");
        assert!(matches!(err, CoverError::Render { .. }));
        // The reset cleared any partial state
        assert!(matches!(
            generator.store().read(),
            Err(CoverError::DigestNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_no_documents_writes_empty_digest() {
        let fx = fixture(&[]);
        let generator = CoverGenerator::new(&fx.covers, Arc::new(StubRenderer::new()));

        generator.generate(&tree(&fx), true).await.unwrap();

        let digest = generator.store().read().unwrap();
        assert_eq!(digest.count, 0);
        assert!(fx.cache.path().join("covers").exists());
    }
}
