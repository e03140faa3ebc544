//! Paginated layout engine
//!
//! The engine owns the page cursor for one export pass and records draw
//! operations in emission order. Renderers ask for vertical space through
//! [`LayoutEngine::check_page_break`] before committing each unit of
//! content; it is the only place a new page is started.
//!
//! Coordinates are millimetres from the top-left corner of the page.

use image::RgbImage;

use crate::direction::TextDirection;
use crate::theme::Rgb;

use super::metrics::{text_width, FontFace};
use super::types::{PageGeometry, PT_TO_MM};

/// Baseline position within a text line, as a fraction of line height
const BASELINE_RATIO: f32 = 0.78;

// ============================================================
// Draw Operations
// ============================================================

/// How a rectangle is painted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStyle {
    Fill,
    Stroke,
    FillStroke,
}

/// One drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    SetFont { face: FontFace, size: f32 },
    SetFill(Rgb),
    SetStroke(Rgb),
    SetLineWidth(f32),
    /// Text run with its baseline at `y`
    Text { x: f32, y: f32, text: String },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        style: PaintStyle,
    },
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// Image by index into [`LaidOutDocument::images`]
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: usize,
    },
}

/// A draw operation with its page and source block
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOp {
    pub page: usize,
    pub block: usize,
    pub op: DrawOp,
}

/// Font, colour and leading of a run of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: FontFace,
    /// Size in points
    pub size: f32,
    pub color: Rgb,
    /// Line height as a multiple of the size
    pub leading: f32,
}

impl TextStyle {
    pub fn new(face: FontFace, size: f32, color: Rgb) -> Self {
        Self {
            face,
            size,
            color,
            leading: 1.4,
        }
    }

    #[must_use]
    pub fn with_leading(mut self, leading: f32) -> Self {
        self.leading = leading;
        self
    }

    /// Line height in millimetres
    pub fn line_height(&self) -> f32 {
        self.size * PT_TO_MM * self.leading
    }
}

// ============================================================
// Cursor and State
// ============================================================

/// Layout state of an export pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// Content flows onto the current page
    Flowing,
    /// A unit did not fit; a page is being appended
    PageBreakPending,
    /// Every block has been laid out
    Done,
}

/// Vertical position on the current page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    /// Offset from the page top in millimetres
    pub y: f32,
    /// Zero-based page index
    pub page: usize,
}

/// Result of a finished layout pass
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutDocument {
    pub geometry: PageGeometry,
    pub pages: usize,
    pub ops: Vec<PlacedOp>,
    pub images: Vec<RgbImage>,
}

impl LaidOutDocument {
    /// Distinct source block indices in order of first appearance
    pub fn block_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = Vec::new();
        for op in &self.ops {
            if order.last() != Some(&op.block) {
                order.push(op.block);
            }
        }
        order
    }

    /// Operations on one page
    pub fn page_ops(&self, page: usize) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(move |p| p.page == page).map(|p| &p.op)
    }
}

// ============================================================
// Engine
// ============================================================

/// Page cursor plus the ordered draw-operation log of one export pass
#[derive(Debug)]
pub struct LayoutEngine {
    geometry: PageGeometry,
    direction: TextDirection,
    cursor: PageCursor,
    state: LayoutState,
    block: usize,
    ops: Vec<PlacedOp>,
    images: Vec<RgbImage>,
    font: Option<(FontFace, f32)>,
    fill: Option<Rgb>,
    stroke: Option<Rgb>,
    line_width: Option<f32>,
}

impl LayoutEngine {
    pub fn new(geometry: PageGeometry, direction: TextDirection) -> Self {
        Self {
            geometry,
            direction,
            cursor: PageCursor {
                y: geometry.margin,
                page: 0,
            },
            state: LayoutState::Flowing,
            block: 0,
            ops: Vec::new(),
            images: Vec::new(),
            font: None,
            fill: None,
            stroke: None,
            line_width: None,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// Number of pages so far
    pub fn page_count(&self) -> usize {
        self.cursor.page + 1
    }

    /// Vertical space left on the current page
    pub fn remaining(&self) -> f32 {
        (self.geometry.bottom() - self.cursor.y).max(0.0)
    }

    /// Left edge of the content box
    pub fn left(&self) -> f32 {
        self.geometry.margin
    }

    /// Width of the content box
    pub fn content_width(&self) -> f32 {
        self.geometry.content_width()
    }

    /// Tag subsequent operations with `index`
    pub fn begin_block(&mut self, index: usize) {
        self.block = index;
    }

    /// Start a new page when `required` does not fit below the cursor.
    /// Returns true when a page was appended and the cursor reset to the
    /// top margin; otherwise the cursor is unchanged.
    pub fn check_page_break(&mut self, required: f32) -> bool {
        if self.cursor.y + required <= self.geometry.bottom() {
            return false;
        }

        self.state = LayoutState::PageBreakPending;
        self.cursor.page += 1;
        self.cursor.y = self.geometry.margin;
        // Graphics state does not carry over to a new content stream
        self.font = None;
        self.fill = None;
        self.stroke = None;
        self.line_width = None;
        tracing::debug!(page = self.cursor.page + 1, block = self.block, "page break");
        self.state = LayoutState::Flowing;
        true
    }

    /// Move the cursor down, never past the bottom margin
    pub fn advance(&mut self, dy: f32) {
        self.cursor.y = (self.cursor.y + dy).min(self.geometry.bottom());
    }

    fn emit(&mut self, op: DrawOp) {
        self.ops.push(PlacedOp {
            page: self.cursor.page,
            block: self.block,
            op,
        });
    }

    pub fn set_font(&mut self, face: FontFace, size: f32) {
        if self.font != Some((face, size)) {
            self.font = Some((face, size));
            self.emit(DrawOp::SetFont { face, size });
        }
    }

    pub fn set_fill(&mut self, color: Rgb) {
        if self.fill != Some(color) {
            self.fill = Some(color);
            self.emit(DrawOp::SetFill(color));
        }
    }

    pub fn set_stroke(&mut self, color: Rgb) {
        if self.stroke != Some(color) {
            self.stroke = Some(color);
            self.emit(DrawOp::SetStroke(color));
        }
    }

    pub fn set_line_width(&mut self, width: f32) {
        if self.line_width != Some(width) {
            self.line_width = Some(width);
            self.emit(DrawOp::SetLineWidth(width));
        }
    }

    /// Place one text line in the box starting `indent` from the left
    /// edge and `width` wide. Right-aligned for RTL documents.
    pub fn text_line(&mut self, text: &str, style: &TextStyle, indent: f32, width: f32) {
        let line_height = style.line_height();
        self.check_page_break(line_height);
        let x = match self.direction {
            TextDirection::Ltr => self.left() + indent,
            TextDirection::Rtl => {
                let box_right = self.left() + indent + width;
                box_right - text_width(text, style.face, style.size)
            }
        };
        self.text_at(text, style, x, self.cursor.y);
        self.advance(line_height);
    }

    /// Place text in a line slot whose top is at `top`
    pub fn text_at(&mut self, text: &str, style: &TextStyle, x: f32, top: f32) {
        if text.is_empty() {
            return;
        }
        self.set_font(style.face, style.size);
        self.set_fill(style.color);
        self.emit(DrawOp::Text {
            x,
            y: top + style.line_height() * BASELINE_RATIO,
            text: text.to_string(),
        });
    }

    /// Rectangle at absolute page coordinates
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, style: PaintStyle) {
        self.emit(DrawOp::Rect {
            x,
            y,
            width,
            height,
            style,
        });
    }

    /// Line at absolute page coordinates
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.emit(DrawOp::Line { x1, y1, x2, y2 });
    }

    /// Place an image at the cursor, breaking first when it does not
    /// fit. The height is capped to one page.
    pub fn image(&mut self, image: RgbImage, x: f32, width: f32, height: f32) {
        let height = height.min(self.geometry.content_height());
        self.check_page_break(height);
        let index = self.images.len();
        self.images.push(image);
        self.emit(DrawOp::Image {
            x,
            y: self.cursor.y,
            width,
            height,
            image: index,
        });
        self.advance(height);
    }

    /// Direction used for text alignment
    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    /// Finish the pass
    pub fn finish(mut self) -> LaidOutDocument {
        self.state = LayoutState::Done;
        tracing::debug!(pages = self.page_count(), ops = self.ops.len(), "layout done");
        LaidOutDocument {
            geometry: self.geometry,
            pages: self.page_count(),
            ops: self.ops,
            images: self.images,
        }
    }
}
