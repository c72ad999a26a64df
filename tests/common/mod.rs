//! Shared helpers for integration tests: small generated PDFs and an app
//! wired to temporary storage.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tempfile::TempDir;

use pdf_analyzer_server::config::Config;
use pdf_analyzer_server::db;
use pdf_analyzer_server::state::AppState;

/// One page of a generated test PDF
#[derive(Debug, Default)]
pub struct TestPage {
    /// Text drawn with Helvetica 24pt at (72, 700)
    pub text: Option<&'static str>,
    /// 2x2 RGB images drawn from the page content, each with its own placement
    pub images: usize,
    /// Images listed in the page resources but never drawn
    pub undrawn_images: usize,
    /// Images drawn from inside a Form XObject the page draws
    pub form_images: usize,
    /// Text drawn to the right of the page edge
    pub off_page_text: Option<&'static str>,
}

impl TestPage {
    pub fn text(text: &'static str) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }

    pub fn with_images(text: &'static str, images: usize) -> Self {
        Self {
            text: Some(text),
            images,
            ..Default::default()
        }
    }
}

fn rgb_image_stream() -> Stream {
    let pixels: Vec<u8> = vec![
        255, 0, 0, 0, 255, 0, //
        0, 0, 255, 255, 255, 255,
    ];
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        pixels,
    )
}

/// Operators drawing `name` as a 200x150 box, stacked down from y=300
fn draw_image(name: &str, slot: usize) -> String {
    let y = 300 - (slot as i64) * 200;
    format!("q 200 0 0 150 100 {} cm /{} Do Q\n", y, name)
}

/// Build a US Letter PDF with the given pages
pub fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let mut content = String::new();
        if let Some(text) = page.text {
            content.push_str(&format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET\n", text));
        }
        if let Some(text) = page.off_page_text {
            content.push_str(&format!("BT /F1 24 Tf 700 700 Td ({}) Tj ET\n", text));
        }

        let mut xobjects = lopdf::Dictionary::new();
        for i in 0..page.images {
            let image_id = doc.add_object(Object::Stream(rgb_image_stream()));
            let name = format!("Im{}", i);
            content.push_str(&draw_image(&name, i));
            xobjects.set(name.into_bytes(), image_id);
        }

        for i in 0..page.undrawn_images {
            let image_id = doc.add_object(Object::Stream(rgb_image_stream()));
            xobjects.set(format!("Unused{}", i).into_bytes(), image_id);
        }

        if page.form_images > 0 {
            let mut form_xobjects = lopdf::Dictionary::new();
            let mut form_content = String::new();
            for i in 0..page.form_images {
                let image_id = doc.add_object(Object::Stream(rgb_image_stream()));
                let name = format!("FormIm{}", i);
                form_content.push_str(&draw_image(&name, i));
                form_xobjects.set(name.into_bytes(), image_id);
            }

            let form_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                    "Resources" => Object::Dictionary(dictionary! {
                        "XObject" => Object::Dictionary(form_xobjects),
                    }),
                },
                form_content.into_bytes(),
            )));
            xobjects.set("Fm0", form_id);
            content.push_str("/Fm0 Do\n");
        }

        let content_id = doc.add_object(Object::Stream(Stream::new(
            lopdf::Dictionary::new(),
            content.into_bytes(),
        )));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => Object::Dictionary(dictionary! {
                "Font" => Object::Dictionary(dictionary! {
                    "F1" => font_id,
                }),
                "XObject" => Object::Dictionary(xobjects),
            }),
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// Point `startxref` at a bogus offset, the kind of damage MuPDF repairs on open
pub fn corrupt_startxref(pdf: &[u8]) -> Vec<u8> {
    let marker = b"startxref";
    let pos = pdf
        .windows(marker.len())
        .rposition(|w| w == marker)
        .expect("PDF has no startxref");

    let mut damaged = pdf[..pos + marker.len()].to_vec();
    damaged.extend_from_slice(b"\n9\n%%EOF\n");
    damaged
}

/// App state backed by a temporary database and temporary directories
pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploaded_files");
        config.storage.analyzed_dir = dir.path().join("analyzed_files");
        config.database.url = format!("sqlite://{}", dir.path().join("pdf_data.db").display());
        config.database.max_connections = 1;

        let pool = db::create_pool(&config.database.url, config.database.max_connections)
            .await
            .unwrap();
        let state = AppState::new(config, pool);

        Self { dir, state }
    }

    pub fn router(&self) -> axum::Router {
        pdf_analyzer_server::routes::router(self.state.clone())
    }

    /// Number of files currently in the SVG output directory
    pub fn analyzed_file_count(&self) -> usize {
        std::fs::read_dir(self.state.files().analyzed_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub const BOUNDARY: &str = "pdf-analyzer-test-boundary";

/// A `multipart/form-data` body with a single `file` part
pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
