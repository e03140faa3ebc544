//! SVG rasterization
//!
//! Code blocks and diagrams are drawn as SVG and rasterized with resvg
//! before being embedded. The font database is the lazily loaded
//! backend: it is built once per rasterizer and shared by every call.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;
use usvg::fontdb;

use crate::interact::TransformState;
use crate::render::text::escape_html;
use crate::theme::{Palette, Rgb};

use super::loader::LoadOnce;
use super::types::ExportError;

/// Resource key of the font database
pub const FONTDB_KEY: &str = "fontdb";

/// Largest raster accepted, in pixels
const MAX_PIXELS: u64 = 40_000_000;

/// Code image metrics in CSS pixels
const CODE_FONT_PX: f32 = 13.0;
const CODE_LINE_PX: f32 = 18.0;
const CODE_PADDING_PX: f32 = 12.0;

/// Size used when an SVG declares no dimensions
const FALLBACK_SVG_SIZE: (f32, f32) = (800.0, 600.0);

/// Rasterization error types
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid SVG: {0}")]
    InvalidSvg(String),

    #[error("No fonts available for SVG text")]
    NoFonts,

    #[error("Empty canvas ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("Raster too large ({width}x{height})")]
    TooLarge { width: u32, height: u32 },

    #[error("Rasterizer backend unavailable: {0}")]
    Backend(String),

    #[error("Rasterization task failed: {0}")]
    Task(String),
}

/// SVG to pixel image conversion
pub trait Rasterizer: Send + Sync {
    /// Load the backend; a failure aborts the export
    fn load(&self) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Rasterize `svg` at `scale` device pixels per SVG unit
    fn rasterize(
        &self,
        svg: &str,
        scale: f32,
    ) -> impl Future<Output = Result<RgbImage, RasterError>> + Send;
}

// ============================================================
// resvg Backend
// ============================================================

/// resvg-based rasterizer
#[derive(Debug)]
pub struct ResvgRasterizer {
    fonts: LoadOnce<Arc<fontdb::Database>>,
    font_dirs: Vec<PathBuf>,
    system_fonts: bool,
    background: Rgb,
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new(Vec::new(), true)
    }
}

impl ResvgRasterizer {
    pub fn new(font_dirs: Vec<PathBuf>, system_fonts: bool) -> Self {
        Self {
            fonts: LoadOnce::new(),
            font_dirs,
            system_fonts,
            background: Rgb::WHITE,
        }
    }

    /// Background painted under transparent areas
    #[must_use]
    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = color;
        self
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    async fn fontdb(&self) -> Result<Arc<fontdb::Database>, ExportError> {
        let dirs = self.font_dirs.clone();
        let system = self.system_fonts;
        self.fonts
            .get_or_load(FONTDB_KEY, || async move {
                tokio::task::spawn_blocking(move || build_fontdb(&dirs, system))
                    .await
                    .map_err(|e| ExportError::LibraryLoad {
                        resource: FONTDB_KEY.to_string(),
                        reason: e.to_string(),
                    })?
            })
            .await
    }
}

fn build_fontdb(dirs: &[PathBuf], system: bool) -> Result<Arc<fontdb::Database>, ExportError> {
    let mut db = fontdb::Database::new();
    for dir in dirs {
        if !dir.is_dir() {
            return Err(ExportError::LibraryLoad {
                resource: dir.display().to_string(),
                reason: "font directory not found".to_string(),
            });
        }
        db.load_fonts_dir(dir);
    }
    if system {
        db.load_system_fonts();
    }
    if db.is_empty() {
        tracing::warn!("no fonts found, text in code and diagram images will fall back");
    } else {
        tracing::info!(faces = db.len(), "font database loaded");
    }
    Ok(Arc::new(db))
}

impl Rasterizer for ResvgRasterizer {
    fn load(&self) -> impl Future<Output = Result<(), ExportError>> + Send {
        async move { self.fontdb().await.map(|_| ()) }
    }

    fn rasterize(
        &self,
        svg: &str,
        scale: f32,
    ) -> impl Future<Output = Result<RgbImage, RasterError>> + Send {
        let svg = svg.to_string();
        async move {
            let db = self
                .fontdb()
                .await
                .map_err(|e| RasterError::Backend(e.to_string()))?;
            let background = self.background;
            tokio::task::spawn_blocking(move || render_svg(&svg, scale, db, background))
                .await
                .map_err(|e| RasterError::Task(e.to_string()))?
        }
    }
}

/// Render an SVG document to an opaque RGB image
pub fn render_svg(
    svg: &str,
    scale: f32,
    fontdb: Arc<fontdb::Database>,
    background: Rgb,
) -> Result<RgbImage, RasterError> {
    if fontdb.is_empty() && svg.contains("<text") {
        return Err(RasterError::NoFonts);
    }

    let mut opts = usvg::Options::default();
    opts.fontdb = fontdb;
    let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| RasterError::InvalidSvg(e.to_string()))?;

    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    if width == 0 || height == 0 {
        return Err(RasterError::EmptyCanvas { width, height });
    }
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(RasterError::TooLarge { width, height });
    }

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::EmptyCanvas { width, height })?;
    let Rgb(r, g, b) = background;
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // Opaque background, so premultiplied RGBA equals straight RGB
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(width, height, rgb).ok_or(RasterError::EmptyCanvas { width, height })
}

// ============================================================
// SVG Builders
// ============================================================

/// Styled SVG of a code block, `width_px` wide
pub fn code_svg(lines: &[String], language: Option<&str>, palette: &Palette, width_px: f32) -> String {
    let height = CODE_PADDING_PX * 2.0 + CODE_LINE_PX * lines.len().max(1) as f32;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width_px,
        h = height
    );
    svg.push_str(&format!(
        r#"<rect x="0.5" y="0.5" width="{}" height="{}" rx="6" fill="{}" stroke="{}"/>"#,
        width_px - 1.0,
        height - 1.0,
        palette.code_bg.to_hex(),
        palette.border.to_hex()
    ));
    if let Some(lang) = language {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="10" text-anchor="end" fill="{}">{}</text>"#,
            width_px - CODE_PADDING_PX,
            CODE_PADDING_PX + 4.0,
            palette.border.to_hex(),
            escape_html(lang)
        ));
    }
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="monospace" font-size="{}" fill="{}" xml:space="preserve">{}</text>"#,
            CODE_PADDING_PX,
            CODE_PADDING_PX + CODE_LINE_PX * (i as f32 + 0.75),
            CODE_FONT_PX,
            palette.code_text.to_hex(),
            escape_html(line)
        ));
    }
    svg.push_str("</svg>");
    svg
}

fn root_attr<'a>(svg: &'a str, name: &str) -> Option<&'a str> {
    let start = svg.find("<svg")?;
    let end = start + svg[start..].find('>')?;
    let tag = &svg[start..end];
    let needle = format!(" {}=\"", name);
    let value_start = tag.find(&needle)? + needle.len();
    let value_len = tag[value_start..].find('"')?;
    Some(&tag[value_start..value_start + value_len])
}

fn parse_length(value: &str) -> Option<f32> {
    let number = value.trim().trim_end_matches("px");
    number.parse::<f32>().ok().filter(|v| *v > 0.0)
}

/// Declared size of an SVG document in CSS pixels
pub fn svg_size(svg: &str) -> (f32, f32) {
    let width = root_attr(svg, "width").and_then(parse_length);
    let height = root_attr(svg, "height").and_then(parse_length);
    if let (Some(w), Some(h)) = (width, height) {
        return (w, h);
    }

    let view_box: Vec<f32> = root_attr(svg, "viewBox")
        .map(|v| {
            v.split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|n| n.parse().ok())
                .collect()
        })
        .unwrap_or_default();
    match view_box.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => (*w, *h),
        _ => FALLBACK_SVG_SIZE,
    }
}

/// Wrap a diagram SVG so it renders as seen in the preview viewport:
/// the transform is applied about the viewport centre and the result is
/// clipped to the original size
pub fn transformed_diagram_svg(svg: &str, state: &TransformState) -> String {
    let (width, height) = svg_size(svg);
    if state.is_identity() {
        return svg.to_string();
    }

    // scaling about the centre, expressed as a transform about the origin
    let about_origin = TransformState {
        scale: state.scale,
        translate_x: state.translate_x + width / 2.0 * (1.0 - state.scale),
        translate_y: state.translate_y + height / 2.0 * (1.0 - state.scale),
    };
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><g transform="{t}">{inner}</g></svg>"#,
        w = width,
        h = height,
        t = about_origin.svg_transform(),
        inner = svg
    )
}
