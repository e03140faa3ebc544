//! Common types for the render module

use thiserror::Error;

use crate::direction::{DirectionMode, TextDirection};
use crate::theme::Theme;

use super::dom::{Element, Node};

/// Placeholder shown when the input is empty
pub const EMPTY_PLACEHOLDER: &str = "Enter some text above to see the rendered output...";

/// Fenced code languages treated as diagram sources
pub const DIAGRAM_LANGUAGES: [&str; 1] = ["mermaid"];

// ============================================================
// Error Types
// ============================================================

/// Render error types
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Markdown parse failed: {0}")]
    ParseFailed(String),

    #[error("Diagram rendering failed: {0}")]
    DiagramFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

// ============================================================
// Options
// ============================================================

/// Render pass options
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Direction selection
    pub direction: DirectionMode,
    /// Theme used for diagram rendering
    pub theme: Theme,
    /// Insert copy buttons into code blocks
    pub copy_buttons: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            direction: DirectionMode::Ltr,
            theme: Theme::Aurora,
            copy_buttons: true,
        }
    }
}

impl RenderOptions {
    /// Create a new options builder
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }
}

/// Builder for RenderOptions
#[derive(Debug, Default)]
pub struct RenderOptionsBuilder {
    options: RenderOptions,
}

impl RenderOptionsBuilder {
    /// Set direction mode
    #[must_use]
    pub fn direction(mut self, mode: DirectionMode) -> Self {
        self.options.direction = mode;
        self
    }

    /// Set theme
    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.options.theme = theme;
        self
    }

    /// Enable or disable copy buttons
    #[must_use]
    pub fn copy_buttons(mut self, enabled: bool) -> Self {
        self.options.copy_buttons = enabled;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> RenderOptions {
        self.options
    }
}

// ============================================================
// Rendered Output
// ============================================================

/// The rendered-output surface of one render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    /// Root container; its direct children are the document blocks
    pub root: Element,
    /// Applied text direction
    pub direction: TextDirection,
    /// Language indicator text
    pub indicator: String,
    /// Number of diagram instances in this pass
    pub diagram_count: usize,
}

impl RenderedOutput {
    /// Wrap a root element rendered left-to-right
    pub fn new(root: Element) -> Self {
        Self {
            root,
            direction: TextDirection::Ltr,
            indicator: "Language: Manual LTR".to_string(),
            diagram_count: 0,
        }
    }

    /// True when the surface holds nothing but whitespace; the empty
    /// input placeholder does not count as content
    pub fn is_empty(&self) -> bool {
        let mut surface = self.root.clone();
        surface.remove_by_class("placeholder");
        surface.children.iter().all(Node::is_blank)
    }

    /// Serialize the surface as an HTML fragment
    pub fn to_html(&self) -> String {
        self.root.to_html()
    }

    /// Ids of the diagram instances, in document order
    pub fn diagram_ids(&self) -> Vec<String> {
        self.root
            .find_all(&|el: &Element| el.has_class("mermaid"))
            .into_iter()
            .filter_map(|el| el.id().map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_default() {
        let opts = RenderOptions::default();
        assert_eq!(opts.direction, DirectionMode::Ltr);
        assert_eq!(opts.theme, Theme::Aurora);
        assert!(opts.copy_buttons);
    }

    #[test]
    fn test_render_options_builder() {
        let opts = RenderOptions::builder()
            .direction(DirectionMode::Auto)
            .theme(Theme::Ocean)
            .copy_buttons(false)
            .build();
        assert_eq!(opts.direction, DirectionMode::Auto);
        assert_eq!(opts.theme, Theme::Ocean);
        assert!(!opts.copy_buttons);
    }

    #[test]
    fn test_rendered_output_empty() {
        let output = RenderedOutput::new(Element::new("div").with_child(Node::Text("  \n ".into())));
        assert!(output.is_empty());

        let output = RenderedOutput::new(Element::new("div").with_child(Node::Element(
            Element::new("p").with_text("Hello"),
        )));
        assert!(!output.is_empty());

        let output = RenderedOutput::new(
            Element::new("div").with_child(Node::Element(
                Element::new("p").with_class("placeholder").with_text(EMPTY_PLACEHOLDER),
            )),
        );
        assert!(output.is_empty());
    }

    #[test]
    fn test_textless_blocks_are_content() {
        let rule = RenderedOutput::new(Element::new("div").with_child(Node::Element(Element::new("hr"))));
        assert!(!rule.is_empty());

        let cell = Element::new("tr").with_child(Node::Element(Element::new("td")));
        let table = RenderedOutput::new(Element::new("div").with_child(Node::Element(
            Element::new("table").with_child(Node::Element(cell)),
        )));
        assert!(!table.is_empty());
    }
}
