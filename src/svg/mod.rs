//! SVG page renderer
//!
//! Draws one page's extraction result as an SVG Tiny document:
//! every word is written at its baseline and framed in green, every placed
//! image is embedded as a PNG data URI and framed in red.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{DynamicImage, ImageFormat};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use thiserror::Error;

use crate::pdf::{ImageBox, PageRect, WordBox};

/// Horizontal padding factor for word frames
pub const WORD_FRAME_WIDTH_SCALE: f32 = 1.03;
/// Vertical padding factor for word frames
pub const WORD_FRAME_HEIGHT_SCALE: f32 = 1.3;

const TEXT_FILL: &str = "black";
const WORD_STROKE: &str = "green";
const IMAGE_STROKE: &str = "red";

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("PNG encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Position and size of a drawn rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The green frame drawn around a word
pub fn word_frame(word: &WordBox) -> Frame {
    Frame {
        x: word.x0,
        y: word.y0,
        width: (word.x1 - word.x0) * WORD_FRAME_WIDTH_SCALE,
        height: (word.y1 - word.y0) * WORD_FRAME_HEIGHT_SCALE,
    }
}

/// The red frame drawn around a placed image (same as the image itself)
pub fn image_frame(rect: &PageRect) -> Frame {
    Frame {
        x: rect.x0,
        y: rect.y0,
        width: rect.width(),
        height: rect.height(),
    }
}

/// Render one page to an SVG string
pub fn render_page(words: &[WordBox], images: &[ImageBox]) -> RenderResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut svg = BytesStart::new("svg");
    svg.push_attribute(("baseProfile", "tiny"));
    svg.push_attribute(("height", "100%"));
    svg.push_attribute(("version", "1.2"));
    svg.push_attribute(("width", "100%"));
    svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    svg.push_attribute(("xmlns:ev", "http://www.w3.org/2001/xml-events"));
    svg.push_attribute(("xmlns:xlink", "http://www.w3.org/1999/xlink"));
    writer.write_event(Event::Start(svg))?;
    writer.write_event(Event::Empty(BytesStart::new("defs")))?;

    for word in words {
        write_word(&mut writer, word)?;
    }

    for image_box in images {
        // Never drawn on the page: nothing to show
        let Some(placement) = image_box.placement else {
            continue;
        };
        write_image(&mut writer, &image_box.image.image, &placement)?;
    }

    writer.write_event(Event::End(BytesEnd::new("svg")))?;

    let result = writer.into_inner().into_inner();
    Ok(String::from_utf8(result)?)
}

/// Render one page and write it to `path`
pub fn save_page(path: &Path, words: &[WordBox], images: &[ImageBox]) -> RenderResult<()> {
    let svg = render_page(words, images)?;
    std::fs::write(path, svg)?;
    Ok(())
}

fn write_word<W: std::io::Write>(writer: &mut Writer<W>, word: &WordBox) -> RenderResult<()> {
    let font_size = fmt_num(word.y1 - word.y0);
    let x = fmt_num(word.x0);
    let y = fmt_num(word.y1);

    let mut text = BytesStart::new("text");
    text.push_attribute(("fill", TEXT_FILL));
    text.push_attribute(("font-size", font_size.as_str()));
    text.push_attribute(("x", x.as_str()));
    text.push_attribute(("y", y.as_str()));
    writer.write_event(Event::Start(text))?;
    writer.write_event(Event::Text(BytesText::new(&word.text)))?;
    writer.write_event(Event::End(BytesEnd::new("text")))?;

    write_frame(writer, &word_frame(word), WORD_STROKE)
}

fn write_image<W: std::io::Write>(
    writer: &mut Writer<W>,
    image: &DynamicImage,
    placement: &PageRect,
) -> RenderResult<()> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    let href = format!("data:image/png;base64,{}", BASE64.encode(&png));

    let frame = image_frame(placement);
    let height = fmt_num(frame.height);
    let width = fmt_num(frame.width);
    let x = fmt_num(frame.x);
    let y = fmt_num(frame.y);

    let mut elem = BytesStart::new("image");
    elem.push_attribute(("height", height.as_str()));
    elem.push_attribute(("width", width.as_str()));
    elem.push_attribute(("x", x.as_str()));
    elem.push_attribute(("xlink:href", href.as_str()));
    elem.push_attribute(("y", y.as_str()));
    writer.write_event(Event::Empty(elem))?;

    write_frame(writer, &frame, IMAGE_STROKE)
}

fn write_frame<W: std::io::Write>(
    writer: &mut Writer<W>,
    frame: &Frame,
    stroke: &str,
) -> RenderResult<()> {
    let height = fmt_num(frame.height);
    let width = fmt_num(frame.width);
    let x = fmt_num(frame.x);
    let y = fmt_num(frame.y);

    let mut rect = BytesStart::new("rect");
    rect.push_attribute(("fill", "none"));
    rect.push_attribute(("height", height.as_str()));
    rect.push_attribute(("stroke", stroke));
    rect.push_attribute(("width", width.as_str()));
    rect.push_attribute(("x", x.as_str()));
    rect.push_attribute(("y", y.as_str()));
    writer.write_event(Event::Empty(rect))?;
    Ok(())
}

/// Shortest round-trip representation
pub fn fmt_num(value: f32) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{ExtractedImage, ImageEncoding};

    fn word(x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> WordBox {
        WordBox::new(PageRect::new(x0, y0, x1, y1), text)
    }

    fn image_box(placement: Option<PageRect>) -> ImageBox {
        ImageBox {
            image: ExtractedImage {
                image: DynamicImage::new_rgb8(2, 2),
                data: Vec::new(),
                encoding: ImageEncoding::Png,
            },
            placement,
        }
    }

    #[test]
    fn test_word_frame_scaling() {
        let w = word(10.0, 20.0, 60.0, 32.0, "anything");
        let frame = word_frame(&w);

        assert_eq!(frame.x, 10.0);
        assert_eq!(frame.y, 20.0);
        assert_eq!(frame.width, (60.0f32 - 10.0) * 1.03);
        assert_eq!(frame.height, (32.0f32 - 20.0) * 1.3);
    }

    #[test]
    fn test_word_frame_ignores_text() {
        let a = word_frame(&word(5.0, 5.0, 25.0, 15.0, "i"));
        let b = word_frame(&word(5.0, 5.0, 25.0, 15.0, "WWWWWWWWWW"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_words() {
        let svg = render_page(&[word(10.0, 20.0, 60.0, 32.0, "Hello")], &[]).unwrap();

        assert!(svg.contains("baseProfile=\"tiny\""));
        assert!(svg.contains(">Hello</text>"));
        assert!(svg.contains("font-size=\"12\""));
        let expected = format!(
            "<rect fill=\"none\" height=\"{}\" stroke=\"green\" width=\"{}\" x=\"10\" y=\"20\"/>",
            fmt_num((32.0f32 - 20.0) * 1.3),
            fmt_num((60.0f32 - 10.0) * 1.03),
        );
        assert!(svg.contains(&expected), "missing {} in {}", expected, svg);
        assert!(!svg.contains("<image"));
    }

    #[test]
    fn test_text_anchor_is_bottom_left() {
        let svg = render_page(&[word(7.5, 100.0, 40.0, 110.5, "a")], &[]).unwrap();
        assert!(svg.contains("x=\"7.5\" y=\"110.5\""));
    }

    #[test]
    fn test_render_escapes_text() {
        let svg = render_page(&[word(0.0, 0.0, 1.0, 1.0, "<a&b>")], &[]).unwrap();
        assert!(svg.contains("&lt;a&amp;b&gt;"));
        assert!(!svg.contains("<a&b>"));
    }

    #[test]
    fn test_unplaced_images_are_skipped() {
        let words = [word(0.0, 0.0, 10.0, 10.0, "x")];
        let with_unplaced = render_page(&words, &[image_box(None), image_box(None)]).unwrap();
        let without = render_page(&words, &[]).unwrap();

        assert_eq!(with_unplaced, without);
        assert!(!with_unplaced.contains("stroke=\"red\""));
    }

    #[test]
    fn test_placed_image_is_embedded_and_framed() {
        let placement = PageRect::new(100.0, 342.0, 300.0, 492.0);
        let svg = render_page(&[], &[image_box(None), image_box(Some(placement))]).unwrap();

        assert_eq!(svg.matches("<image").count(), 1);
        assert!(svg.contains("xlink:href=\"data:image/png;base64,iVBORw0KGgo"));
        assert!(svg.contains(
            "<rect fill=\"none\" height=\"150\" stroke=\"red\" width=\"200\" x=\"100\" y=\"342\"/>"
        ));
        assert!(!svg.contains("stroke=\"green\""));
    }

    #[test]
    fn test_zero_height_word_is_not_guarded() {
        let svg = render_page(&[word(1.0, 5.0, 2.0, 5.0, "flat")], &[]).unwrap();
        assert!(svg.contains("font-size=\"0\""));
        assert!(svg.contains("height=\"0\""));
    }

    #[test]
    fn test_save_page_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page_1_combined.svg");

        save_page(&path, &[word(0.0, 0.0, 10.0, 10.0, "saved")], &[]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml"));
        assert!(written.contains(">saved</text>"));
    }

    #[test]
    fn test_save_page_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("page.svg");

        let result = save_page(&path, &[], &[]);
        assert!(matches!(result, Err(RenderError::Io(_))));
    }
}
