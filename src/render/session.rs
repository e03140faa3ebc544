//! Preview session
//!
//! Owns one rendered document together with its diagram interaction
//! state. Every render pass discards the previous transform store and
//! repeat timers because diagram ids are reassigned.

use std::sync::{Arc, Mutex};

use crate::direction::TextDirection;
use crate::interact::{DiagramController, Gesture, RepeatScheduler, TransformState};

use super::diagram::{add_copy_buttons, apply_diagram_output, wrap_diagrams, DiagramRenderer, SourceCardRenderer};
use super::dom::{Element, Node};
use super::markdown::{CmarkParser, MarkdownParser};
use super::types::{RenderOptions, RenderedOutput, EMPTY_PLACEHOLDER};

/// State shared with repeat timers
#[derive(Debug, Default)]
struct Shared {
    controller: DiagramController,
    output: Option<RenderedOutput>,
}

/// A markdown preview with interactive diagrams
pub struct PreviewSession<P = CmarkParser, D = SourceCardRenderer> {
    parser: P,
    renderer: D,
    options: RenderOptions,
    shared: Arc<Mutex<Shared>>,
    repeats: RepeatScheduler,
}

impl PreviewSession {
    /// Session with the built-in parser and diagram renderer
    pub fn with_defaults(options: RenderOptions) -> Self {
        Self::new(CmarkParser::new(), SourceCardRenderer::new(), options)
    }
}

impl<P: MarkdownParser, D: DiagramRenderer> PreviewSession<P, D> {
    pub fn new(parser: P, renderer: D, options: RenderOptions) -> Self {
        Self {
            parser,
            renderer,
            options,
            shared: Arc::new(Mutex::new(Shared::default())),
            repeats: RepeatScheduler::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        // A panicking repeat action leaves plain data behind; keep using it
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Render `markdown`, replacing the current output
    pub async fn render(&mut self, markdown: &str) -> RenderedOutput {
        self.repeats.stop_all();
        self.lock().controller.begin_render_pass();

        let input = markdown.trim();
        let output = if input.is_empty() {
            RenderedOutput::new(
                Element::new("div")
                    .with_class("markdown-body")
                    .with_child(Node::Element(
                        Element::new("p").with_class("placeholder").with_text(EMPTY_PLACEHOLDER),
                    )),
            )
        } else {
            self.render_document(input).await
        };

        tracing::debug!(
            direction = %output.direction,
            diagrams = output.diagram_count,
            "render pass complete"
        );
        self.lock().output = Some(output.clone());
        output
    }

    async fn render_document(&self, input: &str) -> RenderedOutput {
        let report = self.options.direction.resolve(input);

        let mut root = match self.parser.parse(input) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("markdown rendering failed: {}", e);
                let mut output = RenderedOutput::new(error_surface(&e.to_string()));
                output.direction = report.direction;
                output.indicator = report.indicator;
                return output;
            }
        };

        let containers = wrap_diagrams(&mut root);
        if !containers.is_empty() {
            let outputs = self.renderer.render(&containers, self.options.theme).await;
            apply_diagram_output(&mut root, &containers, outputs);
        }
        if self.options.copy_buttons {
            add_copy_buttons(&mut root);
        }
        root.set_attr("dir", report.direction.as_str());

        RenderedOutput {
            root,
            direction: report.direction,
            indicator: report.indicator,
            diagram_count: containers.len(),
        }
    }

    /// Latest rendered output
    pub fn output(&self) -> Option<RenderedOutput> {
        self.lock().output.clone()
    }

    /// Direction of the latest render
    pub fn direction(&self) -> TextDirection {
        self.lock()
            .output
            .as_ref()
            .map(|o| o.direction)
            .unwrap_or_default()
    }

    /// Apply one gesture to a diagram of the current output
    pub fn gesture(&mut self, diagram_id: &str, gesture: Gesture) -> TransformState {
        let mut shared = self.lock();
        let Shared { controller, output } = &mut *shared;
        match output.as_mut() {
            Some(output) => controller.apply(&mut output.root, diagram_id, gesture),
            None => controller.apply(&mut Element::new("div"), diagram_id, gesture),
        }
    }

    /// Start a press-and-hold gesture; it fires now and then on every
    /// repeat interval until [`PreviewSession::release`]
    pub fn press(&mut self, diagram_id: &str, index: usize, gesture: Gesture) {
        if !gesture.repeats() {
            self.gesture(diagram_id, gesture);
            return;
        }

        let shared = Arc::clone(&self.shared);
        let id = diagram_id.to_string();
        self.repeats.start(gesture.token(index), move || {
            let mut shared = shared.lock().unwrap_or_else(|e| e.into_inner());
            let Shared { controller, output } = &mut *shared;
            if let Some(output) = output.as_mut() {
                controller.apply(&mut output.root, &id, gesture);
            }
        });
    }

    /// Release a held gesture
    pub fn release(&mut self, index: usize, gesture: Gesture) {
        self.repeats.stop(&gesture.token(index));
    }

    /// Number of held gestures still repeating
    pub fn held_count(&self) -> usize {
        self.repeats.active_count()
    }

    /// Begin a pointer drag on a diagram
    pub fn begin_drag(&mut self, diagram_id: &str, x: f32, y: f32) {
        self.lock().controller.begin_drag(diagram_id, x, y);
    }

    /// Pointer moved during a drag
    pub fn drag_move(&mut self, x: f32, y: f32) -> Option<TransformState> {
        let mut shared = self.lock();
        let Shared { controller, output } = &mut *shared;
        let output = output.as_mut()?;
        controller.drag_move(&mut output.root, x, y)
    }

    /// Pointer released
    pub fn end_drag(&mut self) {
        self.lock().controller.end_drag();
    }

    /// Current transform of a diagram
    pub fn transform(&self, diagram_id: &str) -> TransformState {
        self.lock().controller.state(diagram_id)
    }
}

fn error_surface(message: &str) -> Element {
    Element::new("div").with_class("markdown-body").with_child(Node::Element(
        Element::new("p")
            .with_class("render-error")
            .with_child(Node::Element(Element::new("strong").with_text("Rendering Error:")))
            .with_text(format!(" {}", message)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirectionMode;
    use crate::interact::{PanDirection, ZoomDirection};
    use crate::render::types::{RenderError, Result};
    use std::time::Duration;

    struct FailingParser;

    impl MarkdownParser for FailingParser {
        fn parse(&self, _markdown: &str) -> Result<Element> {
            Err(RenderError::ParseFailed("unexpected token".into()))
        }
    }

    const DIAGRAM_DOC: &str = "# Chart\n\n```mermaid\ngraph TD\n  A-->B\n```\n";

    #[tokio::test]
    async fn test_render_basic() {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        let output = session.render("# Title\n\nHello").await;
        let tags: Vec<&str> = output.root.element_children().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["h1", "p"]);
        assert!(!output.is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_placeholder() {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        let output = session.render("   \n\t").await;
        assert!(output.root.text_content().contains(EMPTY_PLACEHOLDER));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_is_contained() {
        let mut session =
            PreviewSession::new(FailingParser, SourceCardRenderer::new(), RenderOptions::default());
        let output = session.render("anything").await;
        let text = output.root.text_content();
        assert!(text.starts_with("Rendering Error:"));
        assert!(text.contains("unexpected token"));
    }

    #[tokio::test]
    async fn test_auto_direction() {
        let options = RenderOptions::builder().direction(DirectionMode::Auto).build();
        let mut session = PreviewSession::with_defaults(options);
        let output = session.render("שלום עולם זהו טקסט בעברית").await;
        assert_eq!(output.direction, TextDirection::Rtl);
        assert_eq!(output.root.attr("dir"), Some("rtl"));
        assert!(output.indicator.contains("Auto: RTL"));
    }

    #[tokio::test]
    async fn test_gestures_update_surface() {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        let output = session.render(DIAGRAM_DOC).await;
        assert_eq!(output.diagram_ids(), vec!["mermaid-0".to_string()]);

        session.gesture("mermaid-0", Gesture::Zoom(ZoomDirection::In));
        session.gesture("mermaid-0", Gesture::Pan(PanDirection::Left));

        let current = session.output().unwrap();
        let content = current.root.find_by_id("mermaid-content-0").unwrap();
        assert_eq!(
            content.attr("style"),
            Some("transform: translate(50px, 0px) scale(1.12)")
        );
    }

    #[tokio::test]
    async fn test_rerender_discards_transforms() {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        session.render(DIAGRAM_DOC).await;
        session.gesture("mermaid-0", Gesture::Zoom(ZoomDirection::In));

        session.render(DIAGRAM_DOC).await;
        assert!(session.transform("mermaid-0").is_identity());
    }

    #[tokio::test]
    async fn test_drag_without_output() {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        session.begin_drag("mermaid-0", 0.0, 0.0);
        assert!(session.drag_move(10.0, 10.0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_and_hold() {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        session.render(DIAGRAM_DOC).await;

        let gesture = Gesture::Zoom(ZoomDirection::In);
        session.press("mermaid-0", 0, gesture);
        session.press("mermaid-0", 0, gesture);
        assert_eq!(session.held_count(), 1);

        tokio::time::advance(Duration::from_millis(150)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        session.release(0, gesture);
        assert_eq!(session.held_count(), 0);

        // Two immediate steps plus one repeat
        let scale = session.transform("mermaid-0").scale;
        assert!((scale - 1.36).abs() < 1e-4, "scale was {}", scale);
    }
}
