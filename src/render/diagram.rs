//! Diagram containers and rendering
//!
//! Fenced diagram blocks are replaced by an interactive wrapper:
//!
//! ```text
//! div.mermaid-wrapper
//!   div.mermaid-controls        (buttons, stripped before export)
//!   div.mermaid-viewport
//!     div.mermaid-content#mermaid-content-<n>   (receives the transform)
//!       div.mermaid#mermaid-<n>                 (receives the SVG)
//! ```
//!
//! A [`DiagramRenderer`] then turns every container's source into SVG.

use std::future::Future;

use crate::interact::{content_element_id, Gesture, PanDirection, TransformState, TransformSurface, ZoomDirection};
use crate::theme::{Palette, Theme};

use super::dom::{Element, Node};
use super::text::escape_html;
use super::types::DIAGRAM_LANGUAGES;

/// Diagram keywords accepted by [`SourceCardRenderer`]
const KNOWN_DIAGRAMS: [&str; 16] = [
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "journey",
    "gitGraph",
    "mindmap",
    "timeline",
    "quadrantChart",
    "requirementDiagram",
    "sankey-beta",
];

/// Source of one diagram instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramContainer {
    /// Instance id (`mermaid-<n>`)
    pub id: String,
    /// Verbatim diagram source
    pub source: String,
}

/// Result of rendering one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramOutput {
    /// Rendered SVG markup
    Svg(String),
    /// Inline error message for invalid source
    Error(String),
}

/// Diagram rendering interface
pub trait DiagramRenderer: Send + Sync {
    /// Render every container; the output is index-aligned with the input
    fn render(
        &self,
        containers: &[DiagramContainer],
        theme: Theme,
    ) -> impl Future<Output = Vec<DiagramOutput>> + Send;
}

// ============================================================
// Wrapper Insertion
// ============================================================

fn diagram_source(pre: &Element) -> Option<String> {
    let code = pre.child("code")?;
    let is_diagram = DIAGRAM_LANGUAGES
        .iter()
        .any(|lang| code.has_class(&format!("language-{}", lang)));
    is_diagram.then(|| code.raw_text())
}

fn control_button(gesture: Gesture, index: usize, label: &str) -> Node {
    Node::Element(
        Element::new("button")
            .with_class("mermaid-btn")
            .with_attr("data-action", gesture.to_string())
            .with_attr("data-token", gesture.token(index))
            .with_text(label),
    )
}

fn build_wrapper(index: usize, source: String) -> Element {
    let id = format!("mermaid-{}", index);
    let state = TransformState::default();

    let controls = Element::new("div")
        .with_class("mermaid-controls")
        .with_child(control_button(Gesture::Zoom(ZoomDirection::In), index, "+"))
        .with_child(control_button(Gesture::Zoom(ZoomDirection::Out), index, "-"))
        .with_child(control_button(Gesture::Pan(PanDirection::Up), index, "↑"))
        .with_child(control_button(Gesture::Pan(PanDirection::Down), index, "↓"))
        .with_child(control_button(Gesture::Pan(PanDirection::Left), index, "←"))
        .with_child(control_button(Gesture::Pan(PanDirection::Right), index, "→"))
        .with_child(control_button(Gesture::Reset, index, "Reset"));

    let mut content = Element::new("div")
        .with_class("mermaid-content")
        .with_attr("id", content_element_id(&id))
        .with_child(Node::Element(
            Element::new("div")
                .with_class("mermaid")
                .with_attr("id", id)
                .with_text(source),
        ));
    write_transform(&mut content, &state);

    Element::new("div")
        .with_class("mermaid-wrapper")
        .with_child(Node::Element(controls))
        .with_child(Node::Element(
            Element::new("div")
                .with_class("mermaid-viewport")
                .with_child(Node::Element(content)),
        ))
}

/// Replace fenced diagram blocks with wrappers, numbering them in
/// document order. Returns the containers to render.
pub fn wrap_diagrams(root: &mut Element) -> Vec<DiagramContainer> {
    let mut containers = Vec::new();
    wrap_in(root, &mut containers);
    containers
}

fn wrap_in(parent: &mut Element, containers: &mut Vec<DiagramContainer>) {
    for node in parent.children.iter_mut() {
        let Node::Element(el) = node else {
            continue;
        };
        let source = if el.tag == "pre" {
            diagram_source(el)
        } else {
            None
        };
        match source {
            Some(source) => {
                let index = containers.len();
                containers.push(DiagramContainer {
                    id: format!("mermaid-{}", index),
                    source: source.clone(),
                });
                *el = build_wrapper(index, source);
            }
            None => wrap_in(el, containers),
        }
    }
}

/// Append a copy button to every remaining code block
pub fn add_copy_buttons(root: &mut Element) {
    for el in root.children.iter_mut().filter_map(Node::as_element_mut) {
        if el.tag == "pre" {
            if !el.has_class("has-copy") {
                el.set_attr("class", "has-copy");
                el.children.push(Node::Element(
                    Element::new("button").with_class("copy-btn").with_text("Copy"),
                ));
            }
        } else {
            add_copy_buttons(el);
        }
    }
}

/// Put rendered diagram output into the containers
pub fn apply_diagram_output(root: &mut Element, containers: &[DiagramContainer], outputs: Vec<DiagramOutput>) {
    for (container, output) in containers.iter().zip(outputs) {
        let Some(target) = root.find_by_id_mut(&container.id) else {
            tracing::warn!(id = %container.id, "diagram container vanished");
            continue;
        };
        target.children.clear();
        match output {
            DiagramOutput::Svg(svg) => {
                target.set_attr("data-processed", "true");
                target.children.push(Node::Raw(svg));
            }
            DiagramOutput::Error(message) => {
                tracing::debug!(id = %container.id, %message, "diagram source rejected");
                target.children.push(Node::Element(
                    Element::new("div")
                        .with_class("mermaid-error")
                        .with_text(format!("Diagram error: {}", message)),
                ));
            }
        }
    }
}

// ============================================================
// Transform Surface
// ============================================================

fn write_transform(content: &mut Element, state: &TransformState) {
    content.set_attr("style", format!("transform: {}", state.css()));
    content.set_attr("data-scale", state.scale.to_string());
    content.set_attr("data-tx", state.translate_x.to_string());
    content.set_attr("data-ty", state.translate_y.to_string());
}

/// Read back the transform recorded on a content element
pub fn read_transform(content: &Element) -> TransformState {
    let read = |name: &str, default: f32| {
        content
            .attr(name)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(default)
    };
    TransformState::new(read("data-scale", 1.0), read("data-tx", 0.0), read("data-ty", 0.0))
}

impl TransformSurface for Element {
    fn apply_transform(&mut self, diagram_id: &str, state: &TransformState) -> bool {
        match self.find_by_id_mut(&content_element_id(diagram_id)) {
            Some(content) => {
                write_transform(content, state);
                true
            }
            None => false,
        }
    }
}

// ============================================================
// Source Card Renderer
// ============================================================

/// Offline renderer drawing the diagram source as a themed SVG card
#[derive(Debug, Clone, Default)]
pub struct SourceCardRenderer;

impl SourceCardRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render one source, validating its leading keyword
    pub fn render_one(&self, source: &str, palette: &Palette) -> DiagramOutput {
        let lines: Vec<&str> = source
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .collect();

        let Some(first) = lines.first() else {
            return DiagramOutput::Error("Empty diagram source".to_string());
        };
        let keyword = first.split_whitespace().next().unwrap_or_default();
        if !KNOWN_DIAGRAMS.contains(&keyword) {
            return DiagramOutput::Error(format!("Unknown diagram type '{}'", keyword));
        }

        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = (longest as u32 * 8 + 48).max(240);
        let height = 56 + lines.len() as u32 * 18;

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        );
        svg.push_str(&format!(
            r#"<rect x="1" y="1" width="{}" height="{}" rx="8" fill="{}" stroke="{}" stroke-width="2"/>"#,
            width - 2,
            height - 2,
            palette.card_bg.to_hex(),
            palette.primary.to_hex()
        ));
        svg.push_str(&format!(
            r#"<rect x="1" y="1" width="{}" height="28" rx="8" fill="{}"/>"#,
            width - 2,
            palette.primary.to_hex()
        ));
        svg.push_str(&format!(
            r##"<text x="16" y="20" font-family="sans-serif" font-size="13" font-weight="bold" fill="#ffffff">{}</text>"##,
            escape_html(keyword)
        ));
        for (i, line) in lines.iter().enumerate() {
            svg.push_str(&format!(
                r#"<text x="16" y="{}" font-family="monospace" font-size="12" fill="{}" xml:space="preserve">{}</text>"#,
                50 + i as u32 * 18,
                palette.text.to_hex(),
                escape_html(line)
            ));
        }
        svg.push_str("</svg>");
        DiagramOutput::Svg(svg)
    }
}

impl DiagramRenderer for SourceCardRenderer {
    fn render(
        &self,
        containers: &[DiagramContainer],
        theme: Theme,
    ) -> impl Future<Output = Vec<DiagramOutput>> + Send {
        let palette = theme.palette();
        let outputs = containers
            .iter()
            .map(|c| self.render_one(&c.source, &palette))
            .collect();
        std::future::ready(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre_block(lang: &str, source: &str) -> Node {
        Node::Element(
            Element::new("pre").with_child(Node::Element(
                Element::new("code")
                    .with_class(format!("language-{}", lang))
                    .with_text(source),
            )),
        )
    }

    fn sample_root() -> Element {
        Element::new("div")
            .with_child(pre_block("mermaid", "graph TD\n  A-->B\n"))
            .with_child(pre_block("rust", "fn main() {}\n"))
            .with_child(Node::Element(
                Element::new("blockquote").with_child(pre_block("mermaid", "pie\n")),
            ))
    }

    #[test]
    fn test_wrap_diagrams_numbers_in_order() {
        let mut root = sample_root();
        let containers = wrap_diagrams(&mut root);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "mermaid-0");
        assert_eq!(containers[1].id, "mermaid-1");
        assert_eq!(containers[1].source, "pie\n");

        let wrapper = root.element_children().next().unwrap();
        assert!(wrapper.has_class("mermaid-wrapper"));
        assert!(wrapper.child("div").unwrap().has_class("mermaid-controls"));
        assert!(root.find_by_id("mermaid-content-0").is_some());
        assert!(root.find_by_id("mermaid-content-1").is_some());
        // Non-diagram code untouched
        assert_eq!(root.element_children().nth(1).unwrap().tag, "pre");
    }

    #[test]
    fn test_copy_buttons_skip_diagrams() {
        let mut root = sample_root();
        wrap_diagrams(&mut root);
        add_copy_buttons(&mut root);
        add_copy_buttons(&mut root);
        let buttons = root.find_all(&|el: &Element| el.has_class("copy-btn"));
        assert_eq!(buttons.len(), 1);
    }

    #[test]
    fn test_transform_surface() {
        let mut root = sample_root();
        wrap_diagrams(&mut root);

        let state = TransformState::new(1.5, 50.0, -20.0);
        assert!(root.apply_transform("mermaid-1", &state));
        let content = root.find_by_id("mermaid-content-1").unwrap();
        assert_eq!(
            content.attr("style"),
            Some("transform: translate(50px, -20px) scale(1.5)")
        );
        assert_eq!(read_transform(content), state);

        assert!(!root.apply_transform("mermaid-9", &state));
    }

    #[test]
    fn test_source_card_renderer() {
        let renderer = SourceCardRenderer::new();
        let palette = Theme::Aurora.palette();

        match renderer.render_one("graph TD\n  A --> B", &palette) {
            DiagramOutput::Svg(svg) => {
                assert!(svg.starts_with("<svg"));
                assert!(svg.contains("A --&gt; B"));
            }
            other => panic!("expected svg, got {:?}", other),
        }
        assert!(matches!(renderer.render_one("   \n", &palette), DiagramOutput::Error(_)));
        assert!(matches!(renderer.render_one("nonsense", &palette), DiagramOutput::Error(_)));
    }

    #[tokio::test]
    async fn test_render_and_apply() {
        let mut root = sample_root();
        let containers = wrap_diagrams(&mut root);
        let outputs = SourceCardRenderer::new().render(&containers, Theme::Midnight).await;
        apply_diagram_output(&mut root, &containers, outputs);

        let first = root.find_by_id("mermaid-0").unwrap();
        assert_eq!(first.attr("data-processed"), Some("true"));
        assert!(matches!(first.children.first(), Some(Node::Raw(svg)) if svg.contains("<svg")));
    }
}
