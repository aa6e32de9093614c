//! Content-type sniffing
//!
//! Classification is content-based, never extension-based: the builder hands
//! the first bytes of each file to a [`MimeSniffer`] and trusts the result.
//! The default [`MagicMimeSniffer`] recognizes the handful of formats the
//! library cares about from their magic bytes.

use std::io::Read;
use std::path::Path;

/// Maximum number of bytes read from a file for sniffing
pub const SNIFF_WINDOW: usize = 10 * 1024;

/// Content type that classifies a file as a structured document
pub const DOCUMENT_MIME: &str = "application/pdf";

/// Content type reported when sniffing fails or nothing matches
pub const UNKNOWN_MIME: &str = "unknown";

/// Injected MIME detection seam
///
/// Implementations receive at most [`SNIFF_WINDOW`] bytes and must not fail:
/// unrecognizable content is reported as [`UNKNOWN_MIME`].
pub trait MimeSniffer: Send + Sync {
    /// Detect the content type of `bytes`
    fn sniff(&self, bytes: &[u8]) -> String;
}

/// Default magic-byte sniffer
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicMimeSniffer;

impl MimeSniffer for MagicMimeSniffer {
    fn sniff(&self, bytes: &[u8]) -> String {
        let bytes = &bytes[..bytes.len().min(SNIFF_WINDOW)];

        if bytes.starts_with(b"%PDF") {
            return DOCUMENT_MIME.to_string();
        }

        // ZIP container: only call it an EPUB when the mimetype entry is
        // visible near the archive head. We don't assume all ZIPs are EPUBs
        // to avoid false positives with .docx, .apk and other ZIP-based
        // formats.
        if bytes.starts_with(b"PK") {
            if let Ok(s) = std::str::from_utf8(&bytes[..bytes.len().min(58)]) {
                if s.contains("epub") {
                    return "application/epub+zip".to_string();
                }
            }
            return "application/zip".to_string();
        }

        if !bytes.is_empty() && looks_like_text(bytes) {
            return "text/plain".to_string();
        }

        UNKNOWN_MIME.to_string()
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok_and(|s| !s.contains('\0'))
}

/// Read the sniff window of a file
///
/// Returns at most [`SNIFF_WINDOW`] bytes; short files yield what they have.
pub fn read_sniff_window(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::with_capacity(SNIFF_WINDOW.min(4096));
    file.take(SNIFF_WINDOW as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
