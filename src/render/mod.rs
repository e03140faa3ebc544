//! Markdown render module
//!
//! Turns markdown into the rendered-output surface: an owned node tree
//! with diagram wrappers, rendered diagrams and copy buttons.
//!
//! # Features
//!
//! - pulldown-cmark parsing with hard line breaks and GFM extensions
//! - Diagram wrappers carrying per-instance transforms
//! - Pluggable diagram rendering with an offline SVG card renderer
//! - Direction detection and language indicator
//! - Parse errors contained at the render boundary
//!
//! # Example
//!
//! ```rust,no_run
//! use markview_pdf::{PreviewSession, RenderOptions};
//!
//! # async fn run() {
//! let mut session = PreviewSession::with_defaults(RenderOptions::default());
//! let output = session.render("# Title\n\nHello").await;
//! println!("{}", output.to_html());
//! # }
//! ```

// Submodules
mod diagram;
mod dom;
mod markdown;
mod session;
pub mod text;
mod types;

// Re-export public API
pub use diagram::{
    add_copy_buttons, apply_diagram_output, read_transform, wrap_diagrams, DiagramContainer,
    DiagramOutput, DiagramRenderer, SourceCardRenderer,
};
pub use dom::{Element, Node};
pub use markdown::{CmarkParser, MarkdownParser, DEFAULT_MAX_INPUT_BYTES};
pub use session::PreviewSession;
pub use types::{
    RenderError, RenderOptions, RenderOptionsBuilder, RenderedOutput, Result, DIAGRAM_LANGUAGES,
    EMPTY_PLACEHOLDER,
};
