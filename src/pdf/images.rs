//! Embedded image extraction
//!
//! Lists the image XObjects reachable from a page's resources, including
//! those nested in Form XObjects, decodes them, and finds where the page
//! content first draws each one.

use std::collections::HashMap;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::error::{ExtractError, ExtractResult};
use super::types::{ExtractedImage, ImageBox, ImageEncoding, PageRect};

/// Forms nested deeper than this are not followed
const MAX_FORM_DEPTH: usize = 16;

/// Extract every image XObject of a page, in resource order
pub fn extract_images(doc: &Document, page_id: ObjectId) -> ExtractResult<Vec<ImageBox>> {
    let resources = match inherited(doc, page_id, b"Resources")? {
        Some(obj) => Some(obj.as_dict()?),
        None => None,
    };

    let mut xobjects = Vec::new();
    collect_images(doc, resources, &mut Vec::new(), &mut xobjects)?;
    if xobjects.is_empty() {
        return Ok(Vec::new());
    }

    let page_box = page_box(doc, page_id)?;
    let content = doc.get_page_content(page_id)?;
    let operations = Content::decode(&content)?.operations;

    let mut tracer = DrawTracer::new(doc);
    tracer.run(&operations, resources, Matrix::IDENTITY)?;

    let mut images = Vec::with_capacity(xobjects.len());
    for (id, stream) in xobjects {
        let image = decode_image(doc, stream)?;
        let placement = tracer
            .placements
            .get(&id)
            .map(|rect| page_box.to_page_space(*rect));

        tracing::trace!(
            object = ?id,
            width = image.image.width(),
            height = image.image.height(),
            placed = placement.is_some(),
            "Extracted image"
        );

        images.push(ImageBox { image, placement });
    }

    Ok(images)
}

// ============================================================================
// Resources
// ============================================================================

/// Follow an indirect reference, if it is one
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> ExtractResult<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up /Parent for inherited keys
fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> ExtractResult<Option<&'a Object>> {
    let mut current = page_id;
    loop {
        let dict = doc.get_object(current)?.as_dict()?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(resolve(doc, value)?));
        }

        match dict.get(b"Parent") {
            Ok(parent) => current = parent.as_reference()?,
            Err(_) => return Ok(None),
        }
    }
}

/// `/Resources` declared directly on a dictionary
fn own_resources<'a>(doc: &'a Document, dict: &'a Dictionary) -> ExtractResult<Option<&'a Dictionary>> {
    match dict.get(b"Resources") {
        Ok(obj) => Ok(Some(resolve(doc, obj)?.as_dict()?)),
        Err(_) => Ok(None),
    }
}

fn xobject_dict<'a>(
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
) -> ExtractResult<Option<&'a Dictionary>> {
    let Some(resources) = resources else {
        return Ok(None);
    };
    match resources.get(b"XObject") {
        Ok(obj) => Ok(Some(resolve(doc, obj)?.as_dict()?)),
        Err(_) => Ok(None),
    }
}

fn subtype(stream: &Stream) -> Option<&[u8]> {
    stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
}

/// Image XObjects reachable from `resources`, following Form XObjects
/// depth-first. Each image object appears once.
fn collect_images<'a>(
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    forms: &mut Vec<ObjectId>,
    images: &mut Vec<(ObjectId, &'a Stream)>,
) -> ExtractResult<()> {
    let Some(xobjects) = xobject_dict(doc, resources)? else {
        return Ok(());
    };

    for (_, obj) in xobjects.iter() {
        let Ok(id) = obj.as_reference() else {
            continue;
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };

        match subtype(stream) {
            Some(b"Image") => {
                if !images.iter().any(|(seen, _)| *seen == id) {
                    images.push((id, stream));
                }
            }
            Some(b"Form") => {
                if !forms.contains(&id) {
                    forms.push(id);
                    collect_images(doc, own_resources(doc, &stream.dict)?, forms, images)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

// ============================================================================
// Placement
// ============================================================================

/// The visible page area in PDF user space (y up), plus its display rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    /// Clockwise, one of 0, 90, 180, 270
    rotation: u16,
}

impl PageBox {
    fn from_array(values: &[Object]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        let n: Vec<f32> = values.iter().filter_map(number).collect();
        if n.len() != 4 {
            return None;
        }
        Some(Self {
            x0: n[0].min(n[2]),
            y0: n[1].min(n[3]),
            x1: n[0].max(n[2]),
            y1: n[1].max(n[3]),
            rotation: 0,
        })
    }

    fn with_rotation(mut self, degrees: i64) -> Self {
        self.rotation = match degrees.rem_euclid(360) {
            90 => 90,
            180 => 180,
            270 => 270,
            _ => 0,
        };
        self
    }

    /// Convert a user-space rectangle to page space: origin top-left, then
    /// turned clockwise by the page rotation
    fn to_page_space(self, rect: PageRect) -> PageRect {
        let width = self.x1 - self.x0;
        let height = self.y1 - self.y0;

        let turn = |x: f32, y: f32| match self.rotation {
            90 => (height - y, x),
            180 => (width - x, height - y),
            270 => (y, width - x),
            _ => (x, y),
        };

        let (ax, ay) = turn(rect.x0 - self.x0, self.y1 - rect.y1);
        let (bx, by) = turn(rect.x1 - self.x0, self.y1 - rect.y0);
        PageRect::new(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by))
    }
}

/// CropBox, falling back to MediaBox, falling back to US Letter
fn page_box(doc: &Document, page_id: ObjectId) -> ExtractResult<PageBox> {
    let rotation = inherited(doc, page_id, b"Rotate")?
        .and_then(|r| r.as_i64().ok())
        .unwrap_or(0);

    for key in [&b"CropBox"[..], &b"MediaBox"[..]] {
        if let Some(obj) = inherited(doc, page_id, key)? {
            if let Some(page_box) = obj.as_array().ok().and_then(|a| PageBox::from_array(a)) {
                return Ok(page_box.with_rotation(rotation));
            }
        }
    }

    let letter = PageBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
        rotation: 0,
    };
    Ok(letter.with_rotation(rotation))
}

/// Affine transform `[a b c d e f]` as used by the `cm` operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let v: Vec<f32> = operands.iter().filter_map(number).collect();
        if v.len() != 6 {
            return None;
        }
        Some(Self {
            a: v[0],
            b: v[1],
            c: v[2],
            d: v[3],
            e: v[4],
            f: v[5],
        })
    }

    /// `self` applied first, then `other`
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounding box of the unit square under this transform
    fn unit_square_bounds(&self) -> PageRect {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for (x, y) in &corners[1..] {
            x0 = x0.min(*x);
            y0 = y0.min(*y);
            x1 = x1.max(*x);
            y1 = y1.max(*y);
        }
        PageRect::new(x0, y0, x1, y1)
    }
}

/// Walks content streams, descending into Form XObjects, and records the
/// user-space rectangle of the first draw of each image object.
pub(crate) struct DrawTracer<'a> {
    doc: &'a Document,
    placements: HashMap<ObjectId, PageRect>,
    forms: Vec<ObjectId>,
}

impl<'a> DrawTracer<'a> {
    pub(crate) fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            placements: HashMap::new(),
            forms: Vec::new(),
        }
    }

    pub(crate) fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        base: Matrix,
    ) -> ExtractResult<()> {
        let mut ctm = base;
        let mut saved = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(m) = saved.pop() {
                        ctm = m;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.draw(name, resources, ctm)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn draw(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
    ) -> ExtractResult<()> {
        let doc = self.doc;
        let Some(id) = xobject_dict(doc, resources)?
            .and_then(|x| x.get(name).ok())
            .and_then(|obj| obj.as_reference().ok())
        else {
            return Ok(());
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            return Ok(());
        };

        match subtype(stream) {
            Some(b"Image") => {
                self.placements
                    .entry(id)
                    .or_insert_with(|| ctm.unit_square_bounds());
            }
            Some(b"Form") => {
                // Self-referencing forms would never terminate
                if self.forms.contains(&id) || self.forms.len() >= MAX_FORM_DEPTH {
                    return Ok(());
                }

                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .and_then(Object::as_array)
                    .ok()
                    .and_then(|m| Matrix::from_operands(m))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = own_resources(doc, &stream.dict)?.or(resources);
                let content = stream_bytes(doc, stream)?;
                let operations = Content::decode(&content)?.operations;

                self.forms.push(id);
                self.run(&operations, form_resources, matrix.then(&ctm))?;
                self.forms.pop();
            }
            _ => {}
        }

        Ok(())
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Sample layout of an image colour space
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn dict_integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> ExtractResult<Option<i64>> {
    match dict.get(key) {
        Ok(obj) => Ok(resolve(doc, obj)?.as_i64().ok()),
        Err(_) => Ok(None),
    }
}

/// Stream filter names, outermost first
fn filters(doc: &Document, dict: &Dictionary) -> ExtractResult<Vec<Vec<u8>>> {
    let obj = match dict.get(b"Filter") {
        Ok(obj) => resolve(doc, obj)?,
        Err(_) => return Ok(Vec::new()),
    };
    match obj {
        Object::Name(name) => Ok(vec![name.clone()]),
        Object::Array(items) => Ok(items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|n| n.to_vec()))
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> ExtractResult<ColorSpace> {
    match resolve(doc, obj)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(ExtractError::UnsupportedImage(format!(
                "color space /{}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|f| f.as_name().ok())
                .ok_or_else(|| ExtractError::InvalidImage("empty color space array".into()))?;

            match family {
                b"CalGray" => Ok(ColorSpace::Gray),
                b"CalRGB" => Ok(ColorSpace::Rgb),
                b"ICCBased" => {
                    let profile = items
                        .get(1)
                        .ok_or_else(|| ExtractError::InvalidImage("ICCBased without profile".into()))?;
                    let profile = resolve(doc, profile)?.as_stream()?;
                    match dict_integer(doc, &profile.dict, b"N")? {
                        Some(1) => Ok(ColorSpace::Gray),
                        Some(3) => Ok(ColorSpace::Rgb),
                        Some(4) => Ok(ColorSpace::Cmyk),
                        n => Err(ExtractError::UnsupportedImage(format!(
                            "ICCBased with {:?} components",
                            n
                        ))),
                    }
                }
                b"Indexed" | b"I" => {
                    if items.len() != 4 {
                        return Err(ExtractError::InvalidImage(
                            "Indexed color space needs 4 entries".into(),
                        ));
                    }
                    let base = parse_color_space(doc, &items[1])?;
                    if matches!(base, ColorSpace::Indexed { .. }) {
                        return Err(ExtractError::InvalidImage("nested Indexed color space".into()));
                    }
                    let hival = resolve(doc, &items[2])?.as_i64()?.clamp(0, 255) as usize;
                    let lookup = match resolve(doc, &items[3])? {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(stream) => stream_bytes(doc, stream)?,
                        _ => {
                            return Err(ExtractError::InvalidImage(
                                "Indexed lookup is neither string nor stream".into(),
                            ))
                        }
                    };
                    Ok(ColorSpace::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                other => Err(ExtractError::UnsupportedImage(format!(
                    "color space family /{}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(ExtractError::InvalidImage("malformed color space".into())),
    }
}

/// Stream content with filters removed
fn stream_bytes(doc: &Document, stream: &Stream) -> ExtractResult<Vec<u8>> {
    if filters(doc, &stream.dict)?.is_empty() {
        Ok(stream.content.clone())
    } else {
        Ok(stream.decompressed_content()?)
    }
}

/// Decode one image XObject
pub(crate) fn decode_image(doc: &Document, stream: &Stream) -> ExtractResult<ExtractedImage> {
    let filters = filters(doc, &stream.dict)?;

    if let Some(last) = filters.last() {
        match last.as_slice() {
            b"DCTDecode" | b"DCT" => {
                if filters.len() != 1 {
                    return Err(ExtractError::UnsupportedImage(
                        "JPEG stream behind additional filters".into(),
                    ));
                }
                let data = stream.content.clone();
                let image = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?;
                return Ok(ExtractedImage {
                    image,
                    data,
                    encoding: ImageEncoding::Jpeg,
                });
            }
            b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode" | b"CCF" => {
                return Err(ExtractError::UnsupportedImage(format!(
                    "/{} image",
                    String::from_utf8_lossy(last)
                )));
            }
            _ => {}
        }
    }

    let dict = &stream.dict;
    let width = dict_integer(doc, dict, b"Width")?
        .filter(|w| *w > 0)
        .ok_or_else(|| ExtractError::InvalidImage("missing /Width".into()))? as u32;
    let height = dict_integer(doc, dict, b"Height")?
        .filter(|h| *h > 0)
        .ok_or_else(|| ExtractError::InvalidImage("missing /Height".into()))? as u32;

    let is_mask = dict
        .get(b"ImageMask")
        .ok()
        .and_then(|m| m.as_bool().ok())
        .unwrap_or(false);

    let color_space = if is_mask {
        ColorSpace::Gray
    } else {
        let cs = dict
            .get(b"ColorSpace")
            .map_err(|_| ExtractError::InvalidImage("missing /ColorSpace".into()))?;
        parse_color_space(doc, cs)?
    };

    let bits = if is_mask {
        1
    } else {
        dict_integer(doc, dict, b"BitsPerComponent")?.unwrap_or(8) as u32
    };

    let samples = stream_bytes(doc, stream)?;
    let image = samples_to_image(&samples, width, height, bits, &color_space)?;

    let mut data = Vec::new();
    image.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;

    Ok(ExtractedImage {
        image,
        data,
        encoding: ImageEncoding::Png,
    })
}

/// Unpack packed samples into one value per component, rows byte-aligned
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bits: u32,
) -> ExtractResult<Vec<u16>> {
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(ExtractError::UnsupportedImage(format!(
            "{} bits per component",
            bits
        )));
    }

    let per_row = width * components;
    let row_bytes = (per_row * bits as usize + 7) / 8;
    if data.len() < row_bytes * height {
        return Err(ExtractError::InvalidImage(format!(
            "expected {} bytes of samples, got {}",
            row_bytes * height,
            data.len()
        )));
    }

    let mut values = Vec::with_capacity(per_row * height);
    for row in data.chunks(row_bytes).take(height) {
        match bits {
            8 => values.extend(row.iter().take(per_row).map(|b| *b as u16)),
            16 => values.extend(
                row.chunks(2)
                    .take(per_row)
                    .map(|p| u16::from_be_bytes([p[0], p.get(1).copied().unwrap_or(0)])),
            ),
            _ => {
                let mask = (1u16 << bits) - 1;
                for i in 0..per_row {
                    let bit_offset = i * bits as usize;
                    let byte = row[bit_offset / 8] as u16;
                    let shift = 8 - bits as usize - (bit_offset % 8);
                    values.push((byte >> shift) & mask);
                }
            }
        }
    }

    Ok(values)
}

fn samples_to_image(
    data: &[u8],
    width: u32,
    height: u32,
    bits: u32,
    color_space: &ColorSpace,
) -> ExtractResult<DynamicImage> {
    let values = unpack_samples(
        data,
        width as usize,
        height as usize,
        color_space.components(),
        bits,
    )?;
    let max = ((1u32 << bits) - 1) as f32;
    let scale = |v: u16| ((v as f32 / max) * 255.0).round() as u8;

    let buffer_error = || ExtractError::InvalidImage("sample buffer size mismatch".into());

    let image = match color_space {
        ColorSpace::Gray => {
            let pixels = values.iter().map(|v| scale(*v)).collect();
            DynamicImage::ImageLuma8(
                GrayImage::from_raw(width, height, pixels).ok_or_else(buffer_error)?,
            )
        }
        ColorSpace::Rgb => {
            let pixels = values.iter().map(|v| scale(*v)).collect();
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels).ok_or_else(buffer_error)?)
        }
        ColorSpace::Cmyk => {
            let pixels = values
                .chunks(4)
                .flat_map(|p| cmyk_to_rgb([scale(p[0]), scale(p[1]), scale(p[2]), scale(p[3])]))
                .collect();
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels).ok_or_else(buffer_error)?)
        }
        ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } => {
            let n = base.components();
            let mut pixels = Vec::with_capacity(values.len() * 3);
            for v in &values {
                let index = (*v as usize).min(*hival);
                let entry = lookup
                    .get(index * n..index * n + n)
                    .ok_or_else(|| ExtractError::InvalidImage("Indexed lookup too short".into()))?;
                let rgb = match base.as_ref() {
                    ColorSpace::Gray => [entry[0]; 3],
                    ColorSpace::Cmyk => cmyk_to_rgb([entry[0], entry[1], entry[2], entry[3]]),
                    _ => [entry[0], entry[1], entry[2]],
                };
                pixels.extend_from_slice(&rgb);
            }
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels).ok_or_else(buffer_error)?)
        }
    };

    Ok(image)
}

/// Naive device CMYK to RGB
fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let k = 255 - k as u16;
    [
        ((255 - c as u16) * k / 255) as u8,
        ((255 - m as u16) * k / 255) as u8,
        ((255 - y as u16) * k / 255) as u8,
    ]
}
