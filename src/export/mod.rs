//! PDF export module
//!
//! Re-lays the rendered-output surface onto fixed-size pages and writes
//! the result as a PDF.
//!
//! # Features
//!
//! - Block classifier over the direct children of the surface
//! - Paginated layout engine with a single page-break decision point
//! - Per-block renderers with text fallback on rasterization failure
//! - Code blocks and diagrams rasterized with resvg, transforms applied
//! - Standard-font text and JPEG images serialized with lopdf
//! - Load-once backend guard and a single in-flight export per exporter
//!
//! # Example
//!
//! ```rust,no_run
//! use markview_pdf::{ExportButton, ExportOptions, NoopProgress, PdfExporter, PreviewSession, RenderOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = PreviewSession::with_defaults(RenderOptions::default());
//! let output = session.render("# Title\n\nHello").await;
//!
//! let exporter = PdfExporter::new(ExportOptions::builder().output_dir("out").build());
//! let outcome = exporter.export(&output, &ExportButton::default(), &NoopProgress).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

// Submodules
mod blocks;
mod classify;
mod exporter;
mod layout;
mod loader;
mod metrics;
mod pdf;
mod raster;
mod table;
mod types;

// Re-export public API
pub use blocks::{fit_height, BlockOutcome, BlockRenderer, Ink, BLOCK_SPACING, HEADING_SIZES, MIN_DIAGRAM_HEIGHT};
pub use classify::{classify, classify_children, export_surface, Block, BlockKind, ListItem, BULLET, INTERACTIVE_CLASSES};
pub use exporter::{export_file_name, ExportButton, ExportControl, LayoutPass, PdfExporter};
pub use layout::{
    DrawOp, LaidOutDocument, LayoutEngine, LayoutState, PageCursor, PaintStyle, PlacedOp,
    TextStyle,
};
pub use loader::LoadOnce;
pub use metrics::{clip_text, encode_win_ansi, text_width, wrap_preformatted, wrap_text, FontFace};
pub use pdf::{encode_jpeg, PdfWriter, PDF_VERSION, PRODUCER};
pub use raster::{
    code_svg, render_svg, svg_size, transformed_diagram_svg, RasterError, Rasterizer,
    ResvgRasterizer, FONTDB_KEY,
};
pub use table::{render_table, CELL_PADDING};
pub use types::{
    ExportError, ExportOptions, ExportOptionsBuilder, ExportOutcome, ExportReport, PageGeometry,
    Result, A4_HEIGHT_MM, A4_WIDTH_MM, BUSY_LABEL, DEFAULT_BODY_SIZE_PT, DEFAULT_JPEG_QUALITY,
    DEFAULT_MARGIN_MM, DEFAULT_RASTER_SCALE, PT_TO_MM, PX_TO_MM,
};
