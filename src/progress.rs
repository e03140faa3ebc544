//! Progress reporting for export passes.
//!
//! The exporter reports through [`ProgressCallback`]; front ends decide
//! how much of it to show via [`OutputMode`].

use std::fmt;
use std::sync::Mutex;

/// Stages of one export pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportStage {
    /// Checking the preview surface
    #[default]
    Preparing,
    /// Loading the rasterization backend
    LoadingBackend,
    /// Laying out blocks onto pages
    LayingOut,
    /// Serializing the PDF
    Writing,
    /// Saving the file
    Saving,
    /// Completed
    Completed,
}

impl ExportStage {
    /// Every stage, in pass order
    pub const ALL: [ExportStage; 6] = [
        ExportStage::Preparing,
        ExportStage::LoadingBackend,
        ExportStage::LayingOut,
        ExportStage::Writing,
        ExportStage::Saving,
        ExportStage::Completed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportStage::Preparing => "Preparing",
            ExportStage::LoadingBackend => "LoadingBackend",
            ExportStage::LayingOut => "LayingOut",
            ExportStage::Writing => "Writing",
            ExportStage::Saving => "Saving",
            ExportStage::Completed => "Completed",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ExportStage::Preparing => "checking preview content",
            ExportStage::LoadingBackend => "loading renderer",
            ExportStage::LayingOut => "laying out pages",
            ExportStage::Writing => "writing PDF",
            ExportStage::Saving => "saving file",
            ExportStage::Completed => "done",
        }
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Stage display only
    #[default]
    Normal,
    /// Block-level progress
    Verbose,
    /// Everything, including debug messages
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

// ============================================================
// Callback
// ============================================================

/// Receives progress from an export pass
pub trait ProgressCallback: Send + Sync {
    fn on_step_start(&self, stage: ExportStage);

    /// `current` of `total` blocks laid out
    fn on_step_progress(&self, current: usize, total: usize);

    fn on_step_complete(&self, stage: ExportStage, message: &str);

    fn on_debug(&self, _message: &str) {}
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_step_start(&self, _stage: ExportStage) {}
    fn on_step_progress(&self, _current: usize, _total: usize) {}
    fn on_step_complete(&self, _stage: ExportStage, _message: &str) {}
}

/// Records events, for tests and summaries
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_step_start(&self, stage: ExportStage) {
        self.push(format!("start:{}", stage.name()));
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        self.push(format!("progress:{}/{}", current, total));
    }

    fn on_step_complete(&self, stage: ExportStage, message: &str) {
        self.push(format!("complete:{}:{}", stage.name(), message));
    }
}
