//! Page rendering seam
//!
//! Rasterizing a document page is the job of the embedding application (a
//! MuPDF or Poppler binding, a remote renderer); the pipeline only needs one
//! call. Implementations are invoked from blocking worker threads, so they
//! may take their time but must be `Send + Sync`.

use std::path::Path;

use image::DynamicImage;

use super::error::CoverError;

/// Injected document page rasterizer
pub trait PageRenderer: Send + Sync {
    /// Render one page of the document at `path` to a raster image
    ///
    /// `page` is 1-based; cover generation only ever asks for page 1.
    fn render_page(&self, path: &Path, page: u32, dpi: u32) -> Result<DynamicImage, CoverError>;
}

impl<F> PageRenderer for F
where
    F: Fn(&Path, u32, u32) -> Result<DynamicImage, CoverError> + Send + Sync,
{
    fn render_page(&self, path: &Path, page: u32, dpi: u32) -> Result<DynamicImage, CoverError> {
        self(path, page, dpi)
    }
}
