//! Extraction error types

use thiserror::Error;

/// Errors raised while pulling words and images out of a PDF
#[derive(Debug, Error)]
pub enum ExtractError {
    /// MuPDF failed to open or read the document
    #[error("MuPDF error: {0}")]
    MuPdf(String),

    /// Object-level parsing failed
    #[error("PDF object error: {0}")]
    Object(#[from] lopdf::Error),

    /// Page index out of range
    #[error("Page {index} not found (document has {count} pages)")]
    PageNotFound { index: usize, count: usize },

    /// MuPDF and the object parser disagree on the page tree
    #[error("Page tree mismatch: MuPDF sees {mupdf} pages, object tree has {objects}")]
    PageTreeMismatch { mupdf: usize, objects: usize },

    /// Image encoding we cannot decode
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Image stream is malformed
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Scratch file for a repaired copy
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image codec failure
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<mupdf::Error> for ExtractError {
    fn from(err: mupdf::Error) -> Self {
        ExtractError::MuPdf(err.to_string())
    }
}

/// Result type alias for extraction
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
