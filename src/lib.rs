//! markview-pdf - Markdown previewer with paginated PDF export
//!
//! Renders markdown into an owned node tree, lets diagrams be panned and
//! zoomed, and re-lays the rendered surface onto A4 pages as a PDF.
//!
//! # Modules
//!
//! - [`render`]: markdown to rendered-output surface, diagrams, copy buttons
//! - [`interact`]: per-diagram transform store and gesture controller
//! - [`export`]: block classifier, paginated layout and PDF writer
//! - [`direction`]: RTL detection and language indicator
//! - [`theme`]: palettes and the persisted theme preference
//! - [`clipboard`]: code block copy with primary and fallback backends
//! - [`config`]: TOML configuration merged with command-line overrides
//! - [`progress`]: export stages and progress callbacks
//!
//! # Example
//!
//! ```rust,no_run
//! use markview_pdf::{ExportButton, ExportOptions, NoopProgress, PdfExporter, PreviewSession, RenderOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = PreviewSession::with_defaults(RenderOptions::default());
//! session.render("```mermaid\ngraph TD; A-->B\n```").await;
//! session.gesture("mermaid-0", "zoom-in".parse()?);
//!
//! let output = session.output().expect("rendered");
//! let exporter = PdfExporter::new(ExportOptions::default());
//! exporter.export(&output, &ExportButton::default(), &NoopProgress).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod direction;
pub mod export;
pub mod interact;
pub mod progress;
pub mod render;
pub mod theme;

// CLI
pub use cli::{Cli, Commands, CopyArgs, ExportArgs, HoldSpec, InputArgs, RenderArgs, ThemeAction, ThemeArgs};

// Clipboard
pub use clipboard::{
    copy_code, ClipboardBackend, ClipboardError, CommandClipboard, CopyButton, CopyLabel,
    CopyStatus, MemoryClipboard, Unavailable, COPY_RESET_DELAY,
};

// Config
pub use config::{CliOverrides, Config, ConfigError, MergedConfig};

// Direction
pub use direction::{detect_language, detect_text_direction, DirectionMode, DirectionReport, TextDirection};

// Export
pub use export::{
    export_file_name, ExportButton, ExportControl, ExportError, ExportOptions, ExportOutcome,
    ExportReport, PageGeometry, PdfExporter, Rasterizer, ResvgRasterizer,
};

// Interaction
pub use interact::{
    DiagramController, Gesture, GestureBinding, InteractError, PanDirection, RepeatScheduler,
    TransformState, TransformStore, TransformSurface, ZoomDirection,
};

// Progress
pub use progress::{ExportStage, NoopProgress, OutputMode, ProgressCallback, RecordingProgress};

// Render
pub use render::{
    DiagramRenderer, Element, MarkdownParser, Node, PreviewSession, RenderError, RenderOptions,
    RenderedOutput, SourceCardRenderer,
};

// Theme
pub use theme::{KeyValueStore, Palette, Theme, ThemeError, ThemeStore};

/// Process exit codes
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Invalid command-line arguments
    pub const INVALID_ARGS: i32 = 2;
    /// Input file not found
    pub const INPUT_NOT_FOUND: i32 = 3;
    /// Nothing to export
    pub const NO_CONTENT: i32 = 4;
    /// Export failed
    pub const EXPORT_ERROR: i32 = 5;
    /// Clipboard copy failed
    pub const CLIPBOARD_ERROR: i32 = 6;
}
