//! Common types for the interaction module

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Smallest allowed diagram scale
pub const MIN_SCALE: f32 = 0.35;
/// Largest allowed diagram scale
pub const MAX_SCALE: f32 = 3.0;
/// Scale change per zoom step
pub const ZOOM_STEP: f32 = 0.12;
/// Translation per pan step
pub const PAN_STEP: f32 = 50.0;

/// Interaction error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InteractError {
    #[error("Invalid gesture '{0}'")]
    InvalidGesture(String),

    #[error("Invalid gesture binding '{0}' (expected <diagram-id>=<gesture>)")]
    InvalidBinding(String),
}

pub type Result<T> = std::result::Result<T, InteractError>;

// ============================================================
// Transform State
// ============================================================

/// Pan/zoom state of one diagram instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    /// Scale factor, kept within [`MIN_SCALE`, `MAX_SCALE`]
    pub scale: f32,
    /// Horizontal translation
    pub translate_x: f32,
    /// Vertical translation
    pub translate_y: f32,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl TransformState {
    pub fn new(scale: f32, translate_x: f32, translate_y: f32) -> Self {
        Self {
            scale: clamp_scale(scale),
            translate_x,
            translate_y,
        }
    }

    /// True when equal to the default state
    pub fn is_identity(&self) -> bool {
        *self == TransformState::default()
    }

    /// CSS transform string applied to the diagram content element
    pub fn css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }

    /// SVG transform attribute equivalent of [`TransformState::css`]
    pub fn svg_transform(&self) -> String {
        format!(
            "translate({} {}) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

/// Clamp a scale into the allowed range
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

// ============================================================
// Gestures
// ============================================================

/// Zoom direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Pan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

/// A discrete control-button gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Zoom(ZoomDirection),
    Pan(PanDirection),
    Reset,
}

impl Gesture {
    /// Whether the button repeats while held
    pub fn repeats(&self) -> bool {
        !matches!(self, Gesture::Reset)
    }

    /// Button token for diagram `index`, e.g. `zoom-in-0`
    pub fn token(&self, index: usize) -> String {
        format!("{}-{}", self, index)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gesture::Zoom(ZoomDirection::In) => "zoom-in",
            Gesture::Zoom(ZoomDirection::Out) => "zoom-out",
            Gesture::Pan(PanDirection::Up) => "pan-up",
            Gesture::Pan(PanDirection::Down) => "pan-down",
            Gesture::Pan(PanDirection::Left) => "pan-left",
            Gesture::Pan(PanDirection::Right) => "pan-right",
            Gesture::Reset => "reset",
        };
        f.write_str(name)
    }
}

impl FromStr for Gesture {
    type Err = InteractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zoom-in" | "in" | "+" => Ok(Gesture::Zoom(ZoomDirection::In)),
            "zoom-out" | "out" | "-" => Ok(Gesture::Zoom(ZoomDirection::Out)),
            "pan-up" | "up" => Ok(Gesture::Pan(PanDirection::Up)),
            "pan-down" | "down" => Ok(Gesture::Pan(PanDirection::Down)),
            "pan-left" | "left" => Ok(Gesture::Pan(PanDirection::Left)),
            "pan-right" | "right" => Ok(Gesture::Pan(PanDirection::Right)),
            "reset" => Ok(Gesture::Reset),
            _ => Err(InteractError::InvalidGesture(s.to_string())),
        }
    }
}

/// A gesture bound to a diagram id, parsed from `mermaid-0=zoom-in`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureBinding {
    pub diagram_id: String,
    pub gesture: Gesture,
}

impl FromStr for GestureBinding {
    type Err = InteractError;

    fn from_str(s: &str) -> Result<Self> {
        let (id, gesture) = s
            .split_once('=')
            .ok_or_else(|| InteractError::InvalidBinding(s.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(InteractError::InvalidBinding(s.to_string()));
        }
        Ok(Self {
            diagram_id: id.to_string(),
            gesture: gesture.parse()?,
        })
    }
}
