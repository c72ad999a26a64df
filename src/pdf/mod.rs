//! PDF extraction module
//!
//! Pulls per-page words and embedded images out of a PDF:
//! - words come from MuPDF structured text
//! - images come from the page's image XObjects, placed by replaying the
//!   content stream's transforms

mod document;
mod error;
mod images;
mod types;
mod words;

pub use document::PdfDocument;
pub use error::{ExtractError, ExtractResult};
pub use types::{ExtractedImage, ImageBox, ImageEncoding, PageContent, PageRect, WordBox};
