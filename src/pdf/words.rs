//! Word extraction from MuPDF structured text

use mupdf::{Page, Quad, TextPageOptions};

use super::error::ExtractResult;
use super::types::{PageRect, WordBox};

/// Extract the words of a page in reading order (block, line, word).
///
/// Characters lying wholly outside the page bounds are dropped.
pub fn extract_words(page: &Page) -> ExtractResult<Vec<WordBox>> {
    let options = TextPageOptions::PRESERVE_LIGATURES | TextPageOptions::PRESERVE_WHITESPACE;
    let text_page = page.to_text_page(options)?;
    let bounds = page.bounds()?;
    let page_rect = PageRect::new(bounds.x0, bounds.y0, bounds.x1, bounds.y1);

    let mut words = Vec::new();

    for block in text_page.blocks() {
        for line in block.lines() {
            let chars = line
                .chars()
                .filter_map(|ch| ch.char().map(|c| (c, quad_bounds(&ch.quad()))));
            words.extend(group_words(clip_to_page(chars, page_rect)));
        }
    }

    Ok(words)
}

/// Keep characters that overlap the page
pub fn clip_to_page<I>(chars: I, page: PageRect) -> impl Iterator<Item = (char, PageRect)>
where
    I: IntoIterator<Item = (char, PageRect)>,
{
    chars
        .into_iter()
        .filter(move |(_, rect)| rect.intersects(&page))
}

/// Split one line's characters into words at whitespace.
///
/// Each word's box is the union of its characters' boxes.
pub fn group_words<I>(chars: I) -> Vec<WordBox>
where
    I: IntoIterator<Item = (char, PageRect)>,
{
    let mut words = Vec::new();
    let mut current: Option<(String, PageRect)> = None;

    for (c, rect) in chars {
        if c.is_whitespace() {
            if let Some((text, bounds)) = current.take() {
                words.push(WordBox::new(bounds, text));
            }
            continue;
        }

        match current.as_mut() {
            Some((text, bounds)) => {
                text.push(c);
                *bounds = bounds.union(&rect);
            }
            None => current = Some((c.to_string(), rect)),
        }
    }

    if let Some((text, bounds)) = current {
        words.push(WordBox::new(bounds, text));
    }

    words
}

/// Character bounding box from its quad
fn quad_bounds(quad: &Quad) -> PageRect {
    PageRect::new(
        quad.ul.x.min(quad.ll.x),
        quad.ul.y.min(quad.ur.y),
        quad.ur.x.max(quad.lr.x),
        quad.ll.y.max(quad.lr.y),
    )
}
