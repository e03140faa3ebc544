//! Diagram interaction controller
//!
//! Translates zoom, pan, drag and reset gestures into transform store
//! mutations. Every mutation is pushed to a [`TransformSurface`] right away
//! so the rendered diagram always reflects the stored state.

use super::store::TransformStore;
use super::types::{
    clamp_scale, Gesture, PanDirection, TransformState, ZoomDirection, PAN_STEP, ZOOM_STEP,
};

/// Something that displays diagram transforms (the rendered node tree)
pub trait TransformSurface {
    /// Apply `state` to the content element of `diagram_id`.
    /// Returns false when the diagram is not present.
    fn apply_transform(&mut self, diagram_id: &str, state: &TransformState) -> bool;
}

/// Id of the content element wrapping diagram `diagram_id`
/// (`mermaid-3` → `mermaid-content-3`)
pub fn content_element_id(diagram_id: &str) -> String {
    let index = diagram_id.strip_prefix("mermaid-").unwrap_or(diagram_id);
    format!("mermaid-content-{}", index)
}

/// Pointer drag in progress
#[derive(Debug, Clone, PartialEq)]
struct DragSession {
    diagram_id: String,
    start_x: f32,
    start_y: f32,
    initial_x: f32,
    initial_y: f32,
}

/// Gesture handler owning the transform store
#[derive(Debug, Default)]
pub struct DiagramController {
    store: TransformStore,
    drag: Option<DragSession>,
}

impl DiagramController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the store
    pub fn store(&self) -> &TransformStore {
        &self.store
    }

    /// Current state of a diagram (created on first access)
    pub fn state(&mut self, diagram_id: &str) -> TransformState {
        self.store.get(diagram_id)
    }

    /// Forget every diagram; diagram ids are reassigned on each render
    pub fn begin_render_pass(&mut self) {
        self.store.clear();
        self.drag = None;
    }

    fn commit(
        &mut self,
        surface: &mut dyn TransformSurface,
        diagram_id: &str,
        state: TransformState,
    ) -> TransformState {
        self.store.set(diagram_id, state);
        if !surface.apply_transform(diagram_id, &state) {
            tracing::debug!(diagram_id, "transform target not found");
        }
        state
    }

    /// Zoom one step in or out, clamped to the scale bounds
    pub fn zoom(
        &mut self,
        surface: &mut dyn TransformSurface,
        diagram_id: &str,
        direction: ZoomDirection,
    ) -> TransformState {
        let mut state = self.store.get(diagram_id);
        state.scale = match direction {
            ZoomDirection::In => clamp_scale(state.scale + ZOOM_STEP),
            ZoomDirection::Out => clamp_scale(state.scale - ZOOM_STEP),
        };
        self.commit(surface, diagram_id, state)
    }

    /// Pan one step; the content moves opposite to the viewport
    pub fn pan(
        &mut self,
        surface: &mut dyn TransformSurface,
        diagram_id: &str,
        direction: PanDirection,
    ) -> TransformState {
        let mut state = self.store.get(diagram_id);
        match direction {
            PanDirection::Up => state.translate_y += PAN_STEP,
            PanDirection::Down => state.translate_y -= PAN_STEP,
            PanDirection::Left => state.translate_x += PAN_STEP,
            PanDirection::Right => state.translate_x -= PAN_STEP,
        }
        self.commit(surface, diagram_id, state)
    }

    /// Restore the default view
    pub fn reset(&mut self, surface: &mut dyn TransformSurface, diagram_id: &str) -> TransformState {
        self.store.reset(diagram_id);
        self.commit(surface, diagram_id, TransformState::default())
    }

    /// Dispatch a control-button gesture
    pub fn apply(
        &mut self,
        surface: &mut dyn TransformSurface,
        diagram_id: &str,
        gesture: Gesture,
    ) -> TransformState {
        match gesture {
            Gesture::Zoom(direction) => self.zoom(surface, diagram_id, direction),
            Gesture::Pan(direction) => self.pan(surface, diagram_id, direction),
            Gesture::Reset => self.reset(surface, diagram_id),
        }
    }

    /// Pointer pressed on a diagram viewport
    pub fn begin_drag(&mut self, diagram_id: &str, pointer_x: f32, pointer_y: f32) {
        let state = self.store.get(diagram_id);
        self.drag = Some(DragSession {
            diagram_id: diagram_id.to_string(),
            start_x: pointer_x,
            start_y: pointer_y,
            initial_x: state.translate_x,
            initial_y: state.translate_y,
        });
    }

    /// Pointer moved; ignored unless a drag is active
    pub fn drag_move(
        &mut self,
        surface: &mut dyn TransformSurface,
        pointer_x: f32,
        pointer_y: f32,
    ) -> Option<TransformState> {
        let drag = self.drag.clone()?;
        let mut state = self.store.get(&drag.diagram_id);
        state.translate_x = drag.initial_x + (pointer_x - drag.start_x);
        state.translate_y = drag.initial_y + (pointer_y - drag.start_y);
        Some(self.commit(surface, &drag.diagram_id, state))
    }

    /// Pointer released
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Diagram currently being dragged
    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.diagram_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interact::types::{MAX_SCALE, MIN_SCALE};
    use proptest::prelude::*;

    /// Records every applied transform
    #[derive(Default)]
    struct RecordingSurface {
        applied: Vec<(String, String)>,
    }

    impl TransformSurface for RecordingSurface {
        fn apply_transform(&mut self, diagram_id: &str, state: &TransformState) -> bool {
            self.applied.push((diagram_id.to_string(), state.css()));
            true
        }
    }

    #[test]
    fn test_content_element_id() {
        assert_eq!(content_element_id("mermaid-3"), "mermaid-content-3");
    }

    #[test]
    fn test_zoom_steps() {
        let mut surface = RecordingSurface::default();
        let mut controller = DiagramController::new();

        let state = controller.zoom(&mut surface, "mermaid-0", ZoomDirection::In);
        assert!((state.scale - 1.12).abs() < 1e-6);
        let state = controller.zoom(&mut surface, "mermaid-0", ZoomDirection::Out);
        assert!((state.scale - 1.0).abs() < 1e-6);
        assert_eq!(surface.applied.len(), 2);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut surface = RecordingSurface::default();
        let mut controller = DiagramController::new();

        for _ in 0..100 {
            controller.zoom(&mut surface, "mermaid-0", ZoomDirection::In);
        }
        assert_eq!(controller.state("mermaid-0").scale, MAX_SCALE);

        for _ in 0..100 {
            controller.zoom(&mut surface, "mermaid-0", ZoomDirection::Out);
        }
        assert_eq!(controller.state("mermaid-0").scale, MIN_SCALE);
    }

    #[test]
    fn test_pan_directions() {
        let mut surface = RecordingSurface::default();
        let mut controller = DiagramController::new();

        controller.pan(&mut surface, "mermaid-0", PanDirection::Up);
        controller.pan(&mut surface, "mermaid-0", PanDirection::Left);
        let state = controller.state("mermaid-0");
        assert_eq!((state.translate_x, state.translate_y), (50.0, 50.0));

        controller.pan(&mut surface, "mermaid-0", PanDirection::Down);
        controller.pan(&mut surface, "mermaid-0", PanDirection::Right);
        controller.pan(&mut surface, "mermaid-0", PanDirection::Right);
        let state = controller.state("mermaid-0");
        assert_eq!((state.translate_x, state.translate_y), (-50.0, 0.0));
        assert_eq!(
            surface.applied.last().unwrap(),
            &("mermaid-0".to_string(), "translate(-50px, 0px) scale(1)".to_string())
        );
    }

    #[test]
    fn test_reset_restores_default() {
        let mut surface = RecordingSurface::default();
        let mut controller = DiagramController::new();

        controller.zoom(&mut surface, "mermaid-0", ZoomDirection::In);
        controller.pan(&mut surface, "mermaid-0", PanDirection::Up);
        let state = controller.reset(&mut surface, "mermaid-0");
        assert!(state.is_identity());
        assert!(controller.state("mermaid-0").is_identity());
    }

    #[test]
    fn test_drag() {
        let mut surface = RecordingSurface::default();
        let mut controller = DiagramController::new();
        controller.pan(&mut surface, "mermaid-1", PanDirection::Left);

        controller.begin_drag("mermaid-1", 100.0, 100.0);
        assert_eq!(controller.dragging(), Some("mermaid-1"));

        let state = controller.drag_move(&mut surface, 130.0, 80.0).unwrap();
        assert_eq!((state.translate_x, state.translate_y), (80.0, -20.0));

        // Moves are relative to the drag start, not cumulative
        let state = controller.drag_move(&mut surface, 90.0, 100.0).unwrap();
        assert_eq!((state.translate_x, state.translate_y), (40.0, 0.0));

        controller.end_drag();
        assert!(controller.drag_move(&mut surface, 500.0, 500.0).is_none());
        assert_eq!(controller.state("mermaid-1").translate_x, 40.0);
    }

    #[test]
    fn test_render_pass_discards_state() {
        let mut surface = RecordingSurface::default();
        let mut controller = DiagramController::new();
        controller.zoom(&mut surface, "mermaid-0", ZoomDirection::In);
        controller.begin_drag("mermaid-0", 0.0, 0.0);

        controller.begin_render_pass();
        assert!(controller.store().is_empty());
        assert!(controller.dragging().is_none());
    }

    fn gesture_strategy() -> impl Strategy<Value = Gesture> {
        prop_oneof![
            Just(Gesture::Zoom(ZoomDirection::In)),
            Just(Gesture::Zoom(ZoomDirection::Out)),
            Just(Gesture::Pan(PanDirection::Up)),
            Just(Gesture::Pan(PanDirection::Right)),
            Just(Gesture::Reset),
        ]
    }

    proptest! {
        #[test]
        fn scale_stays_in_bounds(gestures in prop::collection::vec(gesture_strategy(), 0..200)) {
            let mut surface = RecordingSurface::default();
            let mut controller = DiagramController::new();
            for gesture in gestures {
                let state = controller.apply(&mut surface, "mermaid-0", gesture);
                prop_assert!(state.scale >= MIN_SCALE && state.scale <= MAX_SCALE);
            }
        }

        #[test]
        fn reset_always_restores_default(gestures in prop::collection::vec(gesture_strategy(), 0..50)) {
            let mut surface = RecordingSurface::default();
            let mut controller = DiagramController::new();
            for gesture in gestures {
                controller.apply(&mut surface, "mermaid-0", gesture);
            }
            let state = controller.reset(&mut surface, "mermaid-0");
            prop_assert_eq!(state, TransformState::default());
        }
    }
}
