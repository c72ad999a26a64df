//! Extraction types
//!
//! All coordinates are in page space: origin at the top-left corner,
//! y growing downward, units in PDF points.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::DynamicImage;

/// Axis-aligned rectangle in page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageRect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &PageRect) -> PageRect {
        PageRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether the two overlap with non-zero area
    pub fn intersects(&self, other: &PageRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A single extracted word and its bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub text: String,
}

impl WordBox {
    pub fn new(rect: PageRect, text: impl Into<String>) -> Self {
        Self {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
            text: text.into(),
        }
    }
}

/// How the extracted image bytes are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// JPEG stream copied verbatim from the PDF
    Jpeg,
    /// Raw samples re-encoded as PNG
    Png,
}

/// An image pulled out of a PDF page
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Decoded pixels
    pub image: DynamicImage,
    /// Encoded bytes as extracted
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
}

impl ExtractedImage {
    /// Base64 of the extracted bytes, as persisted
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }
}

/// An embedded image plus where it is drawn on the page, if anywhere
#[derive(Debug, Clone)]
pub struct ImageBox {
    pub image: ExtractedImage,
    pub placement: Option<PageRect>,
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub words: Vec<WordBox>,
    pub images: Vec<ImageBox>,
}

impl PageContent {
    /// Page text: words joined by single spaces
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
