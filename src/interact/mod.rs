//! Diagram interaction module
//!
//! Per-diagram pan/zoom state and the gesture handling that mutates it.
//!
//! # Features
//!
//! - Transform store keyed by diagram id, reset on every render pass
//! - Zoom (clamped), pan, reset and pointer drag gestures
//! - Press-and-hold repeat timers keyed by control token
//!
//! # Example
//!
//! ```rust
//! use markview_pdf::{DiagramController, Gesture, TransformState, TransformSurface};
//!
//! struct NoSurface;
//! impl TransformSurface for NoSurface {
//!     fn apply_transform(&mut self, _id: &str, _state: &TransformState) -> bool {
//!         true
//!     }
//! }
//!
//! let mut controller = DiagramController::new();
//! let state = controller.apply(&mut NoSurface, "mermaid-0", "zoom-in".parse::<Gesture>().unwrap());
//! assert!(state.scale > 1.0);
//! ```

// Submodules
mod controller;
mod repeat;
mod store;
mod types;

// Re-export public API
pub use controller::{content_element_id, DiagramController, TransformSurface};
pub use repeat::{RepeatScheduler, REPEAT_INTERVAL};
pub use store::TransformStore;
pub use types::{
    clamp_scale, Gesture, GestureBinding, InteractError, PanDirection, Result, TransformState,
    ZoomDirection, MAX_SCALE, MIN_SCALE, PAN_STEP, ZOOM_STEP,
};
