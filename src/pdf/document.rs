//! PDF document handle
//!
//! Pairs a MuPDF document (structured text) with an lopdf object tree
//! (image XObjects and content streams) over the same file.
//!
//! MuPDF's `fz_context` is not thread-safe, so a `PdfDocument` is opened,
//! used and dropped on a single blocking thread.

use std::path::{Path, PathBuf};

use mupdf::pdf::PdfDocument as MuPdfDocument;
use mupdf::Document;

use super::error::{ExtractError, ExtractResult};
use super::images::extract_images;
use super::types::PageContent;
use super::words::extract_words;

/// An opened PDF, ready for per-page extraction
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    objects: lopdf::Document,
    page_ids: Vec<lopdf::ObjectId>,
}

impl PdfDocument {
    /// Open a PDF from disk
    pub fn open<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.to_string_lossy();

        let doc = Document::open(&*path_str)?;
        let objects = load_objects(&path)?;

        // get_pages is keyed by 1-based page number, so values come out in order
        let page_ids: Vec<lopdf::ObjectId> = objects.get_pages().values().copied().collect();

        let page_count = doc.page_count()? as usize;
        if page_count != page_ids.len() {
            return Err(ExtractError::PageTreeMismatch {
                mupdf: page_count,
                objects: page_ids.len(),
            });
        }

        tracing::debug!(path = %path.display(), pages = page_count, "Opened PDF");

        Ok(Self {
            path,
            doc,
            objects,
            page_ids,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Extract words and images from a page (0-indexed)
    pub fn extract_page(&self, index: usize) -> ExtractResult<PageContent> {
        let page_id = *self
            .page_ids
            .get(index)
            .ok_or(ExtractError::PageNotFound {
                index,
                count: self.page_ids.len(),
            })?;

        let page = self.doc.load_page(index as i32)?;
        let words = extract_words(&page)?;
        let images = extract_images(&self.objects, page_id)?;

        Ok(PageContent { words, images })
    }
}

/// Load the object tree, falling back to a copy rewritten by MuPDF when the
/// file's cross-reference data is damaged. MuPDF rebuilds it on open.
fn load_objects(path: &Path) -> ExtractResult<lopdf::Document> {
    let err = match lopdf::Document::load(path) {
        Ok(objects) => return Ok(objects),
        Err(err) => err,
    };

    tracing::warn!(
        path = %path.display(),
        error = %err,
        "Object parser rejected PDF, retrying with a MuPDF-repaired copy"
    );

    let repaired = tempfile::Builder::new()
        .prefix("repaired-")
        .suffix(".pdf")
        .tempfile()?;
    let repaired_path = repaired.path().to_string_lossy().into_owned();

    MuPdfDocument::open(&path.to_string_lossy())?.save(&repaired_path)?;

    Ok(lopdf::Document::load(repaired.path())?)
}
