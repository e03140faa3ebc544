//! Block renderers
//!
//! One strategy per [`BlockKind`]. Renderers route every vertical
//! advance through the [`LayoutEngine`] and never abort the pass: when
//! the preferred representation fails they fall back to text.

use base64::Engine as _;
use image::{Rgb as Pixel, RgbImage};

use crate::direction::TextDirection;
use crate::interact::TransformState;
use crate::theme::{Palette, Rgb};

use super::classify::{Block, BlockKind, ListItem};
use super::layout::{LayoutEngine, PaintStyle, TextStyle};
use super::metrics::{text_width, wrap_preformatted, wrap_text, FontFace};
use super::raster::{code_svg, svg_size, transformed_diagram_svg, Rasterizer};
use super::table::render_table;
use super::types::{ExportOptions, PX_TO_MM};

/// Heading sizes in points, h1 to h6
pub const HEADING_SIZES: [f32; 6] = [22.0, 18.0, 15.0, 13.0, 12.0, 11.0];
/// Space above a heading, mm
const HEADING_SPACE_BEFORE: f32 = 4.0;
/// Space below a heading, mm
const HEADING_SPACE_AFTER: f32 = 2.0;
/// Space after paragraphs, lists and other flow blocks, mm
pub const BLOCK_SPACING: f32 = 3.0;
/// Indent per list nesting level, mm
const LIST_INDENT: f32 = 6.0;
/// Blockquote text indent, mm
const QUOTE_INDENT: f32 = 5.0;
/// Blockquote bar width, mm
const QUOTE_BAR: f32 = 1.0;
/// Code fallback font size, pt
const CODE_SIZE: f32 = 9.0;
/// Code fallback padding, mm
const CODE_PADDING: f32 = 2.0;
/// Font size matching the 13px monospace of code images, pt
const CODE_IMAGE_SIZE: f32 = 9.75;
/// Vertical space taken by a rule, mm
const RULE_HEIGHT: f32 = 4.0;
/// Smallest diagram height placed at the bottom of a page, mm
pub const MIN_DIAGRAM_HEIGHT: f32 = 40.0;

/// How a block ended up being drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Preferred representation
    Rendered,
    /// Fallback text, with the reason
    Fallback(String),
}

/// Print colours derived from a theme palette
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ink {
    pub text: Rgb,
    pub heading: Rgb,
    pub muted: Rgb,
    pub accent: Rgb,
    pub border: Rgb,
    pub header_fill: Rgb,
    pub stripe_fill: Rgb,
    pub code_fill: Rgb,
}

impl Ink {
    pub fn from_palette(palette: &Palette) -> Self {
        let dark = Rgb(0x22, 0x22, 0x22);
        Self {
            text: dark,
            heading: palette.primary.mix(Rgb::BLACK, 0.45),
            muted: Rgb(0x66, 0x66, 0x66),
            accent: palette.primary,
            border: Rgb(0xcc, 0xcc, 0xcc),
            header_fill: palette.primary.mix(Rgb::WHITE, 0.75),
            stripe_fill: palette.primary.mix(Rgb::WHITE, 0.92),
            code_fill: Rgb(0xf4, 0xf4, 0xf4),
        }
    }
}

/// Renders classified blocks into a layout engine
pub struct BlockRenderer<'a, R> {
    rasterizer: &'a R,
    options: &'a ExportOptions,
    palette: Palette,
    ink: Ink,
}

impl<'a, R: Rasterizer> BlockRenderer<'a, R> {
    pub fn new(rasterizer: &'a R, options: &'a ExportOptions) -> Self {
        let palette = options.theme.palette();
        Self {
            rasterizer,
            options,
            palette,
            ink: Ink::from_palette(&palette),
        }
    }

    pub fn ink(&self) -> &Ink {
        &self.ink
    }

    fn body(&self) -> TextStyle {
        TextStyle::new(FontFace::Regular, self.options.body_size, self.ink.text)
    }

    /// Lay out one block; the engine tags its operations with the block index
    pub async fn render(&self, engine: &mut LayoutEngine, block: &Block<'_>) -> BlockOutcome {
        engine.begin_block(block.index);
        match &block.kind {
            BlockKind::Heading { level, text } => {
                self.heading(engine, *level, text);
                BlockOutcome::Rendered
            }
            BlockKind::Paragraph { text } | BlockKind::GenericText { text } => {
                self.flow_text(engine, text, &self.body());
                BlockOutcome::Rendered
            }
            BlockKind::List { items, .. } => {
                self.list(engine, items);
                BlockOutcome::Rendered
            }
            BlockKind::Code { language, text } => self.code(engine, language.as_deref(), text).await,
            BlockKind::Blockquote { text } => {
                self.blockquote(engine, text);
                BlockOutcome::Rendered
            }
            BlockKind::Table { headers, rows } => {
                render_table(engine, headers, rows, &self.ink, self.options.body_size - 1.0);
                engine.advance(BLOCK_SPACING);
                BlockOutcome::Rendered
            }
            BlockKind::Rule => {
                self.rule(engine);
                BlockOutcome::Rendered
            }
            BlockKind::Diagram {
                svg,
                transform,
                placeholder,
                ..
            } => self.diagram(engine, svg.as_deref(), transform, placeholder).await,
            BlockKind::Image { src, alt } => self.image(engine, src, alt).await,
        }
    }

    // ============================================================
    // Text Blocks
    // ============================================================

    fn flow_text(&self, engine: &mut LayoutEngine, text: &str, style: &TextStyle) {
        let width = engine.content_width();
        for line in wrap_text(text, style.face, style.size, width) {
            engine.text_line(&line, style, 0.0, width);
        }
        engine.advance(BLOCK_SPACING);
    }

    fn heading(&self, engine: &mut LayoutEngine, level: u8, text: &str) {
        let size = HEADING_SIZES[usize::from(level.clamp(1, 6)) - 1];
        let style = TextStyle::new(FontFace::Bold, size, self.ink.heading).with_leading(1.25);

        if engine.cursor().y > engine.geometry().margin {
            engine.advance(HEADING_SPACE_BEFORE);
        }
        let width = engine.content_width();
        for line in wrap_text(text, style.face, style.size, width) {
            engine.text_line(&line, &style, 0.0, width);
        }
        engine.advance(HEADING_SPACE_AFTER);
    }

    fn list(&self, engine: &mut LayoutEngine, items: &[ListItem]) {
        let style = self.body();
        let content_width = engine.content_width();
        let rtl = engine.direction() == TextDirection::Rtl;

        for item in items {
            let indent = LIST_INDENT * item.depth as f32;
            let marker_width = text_width(&format!("{} ", item.marker), style.face, style.size);
            let text_box = (content_width - indent - marker_width).max(marker_width);

            let mut lines = wrap_text(&item.text, style.face, style.size, text_box);
            if lines.is_empty() {
                lines.push(String::new());
            }

            for (i, line) in lines.iter().enumerate() {
                engine.check_page_break(style.line_height());
                if i == 0 {
                    let x = if rtl {
                        engine.left() + content_width
                            - indent
                            - text_width(&item.marker, style.face, style.size)
                    } else {
                        engine.left() + indent
                    };
                    let top = engine.cursor().y;
                    engine.text_at(&item.marker, &style, x, top);
                }
                let box_indent = if rtl { 0.0 } else { indent + marker_width };
                engine.text_line(line, &style, box_indent, text_box);
            }
        }
        engine.advance(BLOCK_SPACING);
    }

    fn blockquote(&self, engine: &mut LayoutEngine, text: &str) {
        let style = TextStyle::new(FontFace::Oblique, self.options.body_size, self.ink.muted);
        let width = engine.content_width() - QUOTE_INDENT;
        let line_height = style.line_height();
        let rtl = engine.direction() == TextDirection::Rtl;

        for line in wrap_text(text, style.face, style.size, width) {
            engine.check_page_break(line_height);
            let top = engine.cursor().y;
            let bar_x = if rtl {
                engine.left() + engine.content_width() - QUOTE_BAR
            } else {
                engine.left()
            };
            engine.set_fill(self.ink.accent);
            engine.rect(bar_x, top, QUOTE_BAR, line_height, PaintStyle::Fill);
            let indent = if rtl { 0.0 } else { QUOTE_INDENT };
            engine.text_line(&line, &style, indent, width);
        }
        engine.advance(BLOCK_SPACING);
    }

    fn rule(&self, engine: &mut LayoutEngine) {
        engine.check_page_break(RULE_HEIGHT);
        let y = engine.cursor().y + RULE_HEIGHT / 2.0;
        let left = engine.left();
        let right = left + engine.content_width();
        engine.set_stroke(self.ink.border);
        engine.set_line_width(0.3);
        engine.line(left, y, right, y);
        engine.advance(RULE_HEIGHT);
    }

    fn placeholder(&self, engine: &mut LayoutEngine, text: &str) {
        let style = TextStyle::new(FontFace::Oblique, self.options.body_size, self.ink.muted);
        self.flow_text(engine, text, &style);
    }

    // ============================================================
    // Code
    // ============================================================

    async fn code(&self, engine: &mut LayoutEngine, language: Option<&str>, text: &str) -> BlockOutcome {
        let width = engine.content_width();
        let image_lines = wrap_preformatted(text, FontFace::Mono, CODE_IMAGE_SIZE, width - 2.0 * CODE_PADDING);
        let svg = code_svg(&image_lines, language, &self.palette, width / PX_TO_MM);
        let height = svg_size(&svg).1 * PX_TO_MM;

        // Taller than a page: text paginates, an image cannot
        if height > engine.geometry().content_height() {
            self.code_text(engine, text);
            return BlockOutcome::Rendered;
        }

        match self.rasterizer.rasterize(&svg, self.options.raster_scale).await {
            Ok(image) => {
                let left = engine.left();
                engine.image(image, left, width, height);
                engine.advance(BLOCK_SPACING);
                BlockOutcome::Rendered
            }
            Err(e) => {
                tracing::warn!("code block rasterization failed, using text: {}", e);
                self.code_text(engine, text);
                BlockOutcome::Fallback(e.to_string())
            }
        }
    }

    /// Monospace lines on a tinted background
    fn code_text(&self, engine: &mut LayoutEngine, text: &str) {
        let style = TextStyle::new(FontFace::Mono, CODE_SIZE, self.ink.text).with_leading(1.3);
        let line_height = style.line_height();
        let width = engine.content_width();
        let left = engine.left();

        let band = |engine: &mut LayoutEngine, height: f32| {
            engine.check_page_break(height);
            let top = engine.cursor().y;
            engine.set_fill(self.ink.code_fill);
            engine.rect(left, top, width, height, PaintStyle::Fill);
            top
        };

        band(engine, CODE_PADDING);
        engine.advance(CODE_PADDING);
        for line in wrap_preformatted(text, style.face, style.size, width - 2.0 * CODE_PADDING) {
            let top = band(engine, line_height);
            engine.text_at(&line, &style, left + CODE_PADDING, top);
            engine.advance(line_height);
        }
        band(engine, CODE_PADDING);
        engine.advance(CODE_PADDING + BLOCK_SPACING);
    }

    // ============================================================
    // Diagrams and Images
    // ============================================================

    async fn diagram(
        &self,
        engine: &mut LayoutEngine,
        svg: Option<&str>,
        transform: &TransformState,
        placeholder: &str,
    ) -> BlockOutcome {
        let Some(svg) = svg else {
            self.placeholder(engine, placeholder);
            return BlockOutcome::Fallback("no rendered diagram".to_string());
        };

        let source = transformed_diagram_svg(svg, transform);
        match self.rasterizer.rasterize(&source, self.options.raster_scale).await {
            Ok(image) => {
                let (w, h) = image.dimensions();
                let width = engine.content_width();
                let height = width * h as f32 / w as f32;

                // Too little room left for a legible diagram: start a new page
                engine.check_page_break(height.min(MIN_DIAGRAM_HEIGHT));
                let (width, height) = fit_height(width, height, engine.remaining());

                let x = engine.left() + (engine.content_width() - width) / 2.0;
                engine.image(image, x, width, height);
                engine.advance(BLOCK_SPACING);
                BlockOutcome::Rendered
            }
            Err(e) => {
                tracing::warn!("diagram rasterization failed, using placeholder: {}", e);
                self.placeholder(engine, placeholder);
                BlockOutcome::Fallback(e.to_string())
            }
        }
    }

    async fn image(&self, engine: &mut LayoutEngine, src: &str, alt: &str) -> BlockOutcome {
        match self.load_image(src).await {
            Ok(image) => {
                let (w, h) = image.dimensions();
                let width = engine.content_width();
                let height = width * h as f32 / w as f32;
                let (width, height) = fit_height(width, height, engine.geometry().content_height());

                let x = engine.left() + (engine.content_width() - width) / 2.0;
                engine.image(image, x, width, height);
                engine.advance(BLOCK_SPACING);
                BlockOutcome::Rendered
            }
            Err(reason) => {
                tracing::warn!(src, "image unavailable: {}", reason);
                let label = if alt.is_empty() { src } else { alt };
                self.placeholder(engine, &format!("[Image: {}]", label));
                BlockOutcome::Fallback(reason)
            }
        }
    }

    async fn load_image(&self, src: &str) -> Result<RgbImage, String> {
        let bytes = if let Some(data) = src.strip_prefix("data:") {
            let (meta, payload) = data.split_once(',').ok_or("malformed data URI")?;
            if !meta.ends_with(";base64") {
                return Err("only base64 data URIs are supported".to_string());
            }
            base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| format!("invalid base64: {}", e))?
        } else if src.starts_with("http://") || src.starts_with("https://") {
            return Err("remote images are not fetched".to_string());
        } else if src.is_empty() {
            return Err("empty image source".to_string());
        } else {
            let path = self.options.base_dir.join(src.strip_prefix("file://").unwrap_or(src));
            tokio::fs::read(&path)
                .await
                .map_err(|e| format!("{}: {}", path.display(), e))?
        };

        let decoded = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err("empty image".to_string());
        }
        Ok(flatten_alpha(&decoded.to_rgba8()))
    }
}

/// Composite an RGBA image over white
fn flatten_alpha(rgba: &image::RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Pixel([over(r), over(g), over(b)])
    })
}

/// Downscale `(width, height)` to at most `max_height`, keeping the aspect
pub fn fit_height(width: f32, height: f32, max_height: f32) -> (f32, f32) {
    if height <= max_height || height <= 0.0 {
        return (width, height);
    }
    let k = max_height / height;
    (width * k, max_height)
}
