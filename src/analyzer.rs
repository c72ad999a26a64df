//! Upload analysis
//!
//! Stores an uploaded PDF, walks its pages in order, renders each page's SVG
//! overlay and records one `pdf_data` row per embedded image.

use std::path::{Path, PathBuf};

use crate::db::{NewPageRecord, PageRecordRepository};
use crate::error::{AppError, Result};
use crate::pdf::PdfDocument;
use crate::state::AppState;
use crate::storage::FileStore;
use crate::svg;

/// Result of analyzing one page
#[derive(Debug, Clone)]
pub struct AnalyzedPage {
    /// 1-based
    pub page_number: usize,
    /// Words joined by single spaces
    pub text: String,
    /// Base64 of each image on the page, in resource order
    pub images: Vec<String>,
    pub svg_path: PathBuf,
}

/// Result of analyzing a whole document
#[derive(Debug, Clone)]
pub struct Analysis {
    pub file_name: String,
    pub pages: Vec<AnalyzedPage>,
}

impl Analysis {
    /// Generated SVG paths, in page order
    pub fn svg_files(&self) -> Vec<String> {
        self.pages
            .iter()
            .map(|p| p.svg_path.to_string_lossy().into_owned())
            .collect()
    }

    /// Text of all pages, newline separated, surrounding whitespace trimmed
    pub fn text(&self) -> String {
        let mut all = String::new();
        for page in &self.pages {
            all.push_str(&page.text);
            all.push('\n');
        }
        all.trim().to_string()
    }

    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }
}

/// Extract and render every page of a stored PDF.
///
/// Blocking: MuPDF work must stay on one thread.
pub fn render_document(pdf_path: &Path, files: &FileStore) -> Result<Vec<AnalyzedPage>> {
    let doc = PdfDocument::open(pdf_path)?;
    let mut pages = Vec::with_capacity(doc.page_count());

    for index in 0..doc.page_count() {
        let page_number = index + 1;
        let content = doc.extract_page(index)?;

        let svg_path = files.svg_path(page_number);
        svg::save_page(&svg_path, &content.words, &content.images)?;

        tracing::debug!(
            path = %doc.path().display(),
            page = page_number,
            words = content.words.len(),
            images = content.images.len(),
            "Rendered page"
        );

        pages.push(AnalyzedPage {
            page_number,
            text: content.text(),
            images: content.images.iter().map(|i| i.image.to_base64()).collect(),
            svg_path,
        });
    }

    Ok(pages)
}

fn stored_file_name(pdf_path: &Path, file_name: &str) -> String {
    pdf_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Store, analyze and persist an uploaded PDF
pub async fn analyze_upload(state: &AppState, file_name: &str, data: &[u8]) -> Result<Analysis> {
    let files = state.files().clone();
    files.ensure_dirs().await?;

    let pdf_path = files.save_upload(file_name, data).await?;
    // Rows carry the name the upload is stored and served under
    let stored_name = stored_file_name(&pdf_path, file_name);

    let pages = tokio::task::spawn_blocking(move || render_document(&pdf_path, &files))
        .await
        .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))??;

    let repo = PageRecordRepository::new(state.db());
    for page in &pages {
        for image_data in &page.images {
            repo.create(&NewPageRecord {
                file_name: &stored_name,
                page_number: page.page_number as i64,
                text: &page.text,
                image_data,
            })
            .await?;
        }
    }

    let analysis = Analysis {
        file_name: stored_name,
        pages,
    };

    tracing::info!(
        file_name = %analysis.file_name,
        pages = analysis.pages.len(),
        images = analysis.image_count(),
        "PDF analyzed"
    );

    Ok(analysis)
}
