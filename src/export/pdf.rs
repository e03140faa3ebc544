//! PDF serialization
//!
//! Turns a [`LaidOutDocument`] into PDF bytes with lopdf. Layout
//! coordinates are millimetres from the top-left; PDF user space is
//! points from the bottom-left, so every position is scaled and flipped
//! here.

use std::collections::BTreeMap;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::layout::{DrawOp, LaidOutDocument, PaintStyle};
use super::metrics::{encode_win_ansi, FontFace};
use super::types::{ExportError, Result, PT_TO_MM};

/// PDF version written to the header
pub const PDF_VERSION: &str = "1.5";
/// Producer recorded in the document info
pub const PRODUCER: &str = concat!("markview-pdf ", env!("CARGO_PKG_VERSION"));

fn pt(mm: f32) -> f32 {
    mm / PT_TO_MM
}

/// Serializes laid-out pages
#[derive(Debug, Clone)]
pub struct PdfWriter {
    jpeg_quality: u8,
    title: Option<String>,
}

impl PdfWriter {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Write `layout` as a complete PDF file
    pub fn write(&self, layout: &LaidOutDocument) -> Result<Vec<u8>> {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();

        let fonts = self.add_fonts(&mut doc);
        let images = self.add_images(&mut doc, &layout.images)?;

        let page_height = pt(layout.geometry.height);
        let page_width = pt(layout.geometry.width);

        let mut kids = Vec::with_capacity(layout.pages);
        for page in 0..layout.pages {
            let mut used: BTreeMap<String, Object> = BTreeMap::new();
            let mut operations = Vec::new();
            for op in layout.page_ops(page) {
                if let DrawOp::Image { image, .. } = op {
                    if let Some(&id) = images.get(*image) {
                        used.insert(image_name(*image), Object::Reference(id));
                    }
                }
                operations.extend(translate(op, page_height));
            }

            let content = Content { operations }
                .encode()
                .map_err(|e| ExportError::Serialization(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));

            let mut xobjects = Dictionary::new();
            for (name, reference) in used {
                xobjects.set(name, reference);
            }
            let resources = dictionary! {
                "Font" => fonts.clone(),
                "XObject" => xobjects,
            };

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    page_width.into(),
                    page_height.into(),
                ],
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
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

        let info_id = doc.add_object(self.info());
        doc.trailer.set("Info", info_id);

        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Serialization(e.to_string()))?;
        tracing::debug!(pages = layout.pages, bytes = bytes.len(), "pdf serialized");
        Ok(bytes)
    }

    fn add_fonts(&self, doc: &mut Document) -> Dictionary {
        let mut fonts = Dictionary::new();
        for face in FontFace::ALL {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(face.resource(), id);
        }
        fonts
    }

    fn add_images(&self, doc: &mut Document, images: &[RgbImage]) -> Result<Vec<ObjectId>> {
        images
            .iter()
            .map(|image| {
                let jpeg = encode_jpeg(image, self.jpeg_quality)?;
                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(image.width()),
                        "Height" => i64::from(image.height()),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8_i64,
                        "Filter" => "DCTDecode",
                    },
                    jpeg,
                )
                .with_compression(false);
                Ok(doc.add_object(stream))
            })
            .collect()
    }

    fn info(&self) -> Dictionary {
        let mut info = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(
                chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string(),
            ),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(encode_win_ansi(title)));
        }
        info
    }
}

fn image_name(index: usize) -> String {
    format!("Im{}", index)
}

/// Encode an RGB raster as baseline JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| ExportError::Serialization(format!("JPEG encoding failed: {}", e)))?;
    Ok(buf)
}

fn rgb_operands(color: crate::theme::Rgb) -> Vec<Object> {
    let (r, g, b) = color.unit();
    vec![r.into(), g.into(), b.into()]
}

/// Content stream operations for one draw op
fn translate(op: &DrawOp, page_height: f32) -> Vec<Operation> {
    let flip = |y_mm: f32| page_height - pt(y_mm);

    match op {
        DrawOp::SetFont { face, size } => vec![Operation::new(
            "Tf",
            vec![Object::Name(face.resource().as_bytes().to_vec()), (*size).into()],
        )],
        DrawOp::SetFill(color) => vec![Operation::new("rg", rgb_operands(*color))],
        DrawOp::SetStroke(color) => vec![Operation::new("RG", rgb_operands(*color))],
        DrawOp::SetLineWidth(width) => vec![Operation::new("w", vec![pt(*width).into()])],
        DrawOp::Text { x, y, text } => vec![
            Operation::new("BT", vec![]),
            Operation::new("Td", vec![pt(*x).into(), flip(*y).into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ],
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            style,
        } => {
            let paint = match style {
                PaintStyle::Fill => "f",
                PaintStyle::Stroke => "S",
                PaintStyle::FillStroke => "B",
            };
            vec![
                Operation::new(
                    "re",
                    vec![
                        pt(*x).into(),
                        flip(y + height).into(),
                        pt(*width).into(),
                        pt(*height).into(),
                    ],
                ),
                Operation::new(paint, vec![]),
            ]
        }
        DrawOp::Line { x1, y1, x2, y2 } => vec![
            Operation::new("m", vec![pt(*x1).into(), flip(*y1).into()]),
            Operation::new("l", vec![pt(*x2).into(), flip(*y2).into()]),
            Operation::new("S", vec![]),
        ],
        DrawOp::Image {
            x,
            y,
            width,
            height,
            image,
        } => vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    pt(*width).into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    pt(*height).into(),
                    pt(*x).into(),
                    flip(y + height).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name(*image).into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::TextDirection;
    use crate::export::layout::{LayoutEngine, TextStyle};
    use crate::export::types::PageGeometry;
    use crate::theme::Rgb;

    fn page_operators(bytes: &[u8], page: u32) -> Vec<Operation> {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        let content = doc.get_page_content(pages[&page]).unwrap();
        Content::decode(&content).unwrap().operations
    }

    fn shown_text(ops: &[Operation]) -> Vec<Vec<u8>> {
        ops.iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands[0].as_str().ok().map(<[u8]>::to_vec))
            .collect()
    }

    #[test]
    fn test_single_page_text() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        engine.text_line("Hello", &TextStyle::new(FontFace::Regular, 11.0, Rgb::BLACK), 0.0, 180.0);
        let bytes = PdfWriter::new(90).write(&engine.finish()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let ops = page_operators(&bytes, 1);
        assert_eq!(shown_text(&ops), vec![b"Hello".to_vec()]);
        assert!(ops.iter().any(|op| op.operator == "Tf"));
    }

    #[test]
    fn test_y_axis_flipped() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        engine.rect(15.0, 15.0, 10.0, 10.0, PaintStyle::Fill);
        let bytes = PdfWriter::new(90).write(&engine.finish()).unwrap();

        let ops = page_operators(&bytes, 1);
        let re = ops.iter().find(|op| op.operator == "re").unwrap();
        let y = re.operands[1].as_float().unwrap();
        // top edge 15mm below the page top: bottom edge at 297 - 25 mm
        assert!((y - pt(297.0 - 25.0)).abs() < 0.01);
    }

    #[test]
    fn test_one_page_object_per_layout_page() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        let style = TextStyle::new(FontFace::Regular, 11.0, Rgb::BLACK);
        for i in 0..200 {
            engine.text_line(&format!("line {}", i), &style, 0.0, 180.0);
        }
        let layout = engine.finish();
        let bytes = PdfWriter::new(90).write(&layout).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), layout.pages);
        assert!(layout.pages > 1);
    }

    #[test]
    fn test_image_xobject() {
        let mut engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        engine.image(RgbImage::from_pixel(8, 4, image::Rgb([200, 10, 10])), 15.0, 80.0, 40.0);
        let bytes = PdfWriter::new(80).write(&engine.finish()).unwrap();

        let ops = page_operators(&bytes, 1);
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, vec!["q", "cm", "Do", "Q"]);

        let doc = Document::load_mem(&bytes).unwrap();
        let image_count = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice()))
            .count();
        assert_eq!(image_count, 1);
    }

    #[test]
    fn test_title_in_info() {
        let engine = LayoutEngine::new(PageGeometry::a4(), TextDirection::Ltr);
        let bytes = PdfWriter::new(90)
            .with_title("Notes")
            .write(&engine.finish())
            .unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let info_ref = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_ref).unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Notes");
    }

    #[test]
    fn test_encode_jpeg() {
        let jpeg = encode_jpeg(&RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0])), 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
