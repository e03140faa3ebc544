//! Common types for the export module

use std::path::PathBuf;

use thiserror::Error;

use crate::theme::Theme;

/// Millimetres per typographic point
pub const PT_TO_MM: f32 = 0.352_778;
/// Millimetres per CSS pixel (96 dpi)
pub const PX_TO_MM: f32 = 0.264_583;

/// A4 width in millimetres
pub const A4_WIDTH_MM: f32 = 210.0;
/// A4 height in millimetres
pub const A4_HEIGHT_MM: f32 = 297.0;
/// Default page margin in millimetres
pub const DEFAULT_MARGIN_MM: f32 = 15.0;

/// Default body text size in points
pub const DEFAULT_BODY_SIZE_PT: f32 = 11.0;
/// Default rasterization scale (device pixels per CSS pixel)
pub const DEFAULT_RASTER_SCALE: f32 = 2.0;
/// Default JPEG quality for embedded images
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Label shown on the export control while a pass runs
pub const BUSY_LABEL: &str = "Generating PDF...";

// ============================================================
// Error Types
// ============================================================

/// Export error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No content to export. Please render markdown first.")]
    NoContent,

    #[error("Failed to load {resource}: {reason}")]
    LibraryLoad { resource: String, reason: String },

    #[error("PDF serialization failed: {0}")]
    Serialization(String),

    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

// ============================================================
// Page Geometry
// ============================================================

/// Fixed page size and margin, in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    /// A4 portrait with the default margin
    pub fn a4() -> Self {
        Self {
            width: A4_WIDTH_MM,
            height: A4_HEIGHT_MM,
            margin: DEFAULT_MARGIN_MM,
        }
    }

    /// Validate dimensions
    pub fn validate(&self) -> Result<()> {
        let usable = self.width > 2.0 * self.margin && self.height > 2.0 * self.margin;
        if !usable || !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "{}x{} mm with {} mm margin leaves no content area",
                self.width, self.height, self.margin
            )));
        }
        Ok(())
    }

    /// Width available to content
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Height available to content on one page
    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    /// Lowest y position content may reach
    pub fn bottom(&self) -> f32 {
        self.height - self.margin
    }

    /// Right edge of the content box
    pub fn right(&self) -> f32 {
        self.width - self.margin
    }
}

// ============================================================
// Options
// ============================================================

/// Export options
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Page geometry
    pub page: PageGeometry,
    /// Directory receiving the PDF
    pub output_dir: PathBuf,
    /// Base directory for relative image paths
    pub base_dir: PathBuf,
    /// Rasterization scale for code and diagram images
    pub raster_scale: f32,
    /// JPEG quality for embedded images (1-100)
    pub jpeg_quality: u8,
    /// Body text size in points
    pub body_size: f32,
    /// Theme supplying tint colours
    pub theme: Theme,
    /// Extra font directories for the rasterizer
    pub font_dirs: Vec<PathBuf>,
    /// Load system fonts for the rasterizer
    pub system_fonts: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page: PageGeometry::a4(),
            output_dir: PathBuf::from("."),
            base_dir: PathBuf::from("."),
            raster_scale: DEFAULT_RASTER_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            body_size: DEFAULT_BODY_SIZE_PT,
            theme: Theme::Aurora,
            font_dirs: Vec::new(),
            system_fonts: true,
        }
    }
}

impl ExportOptions {
    /// Create a new options builder
    pub fn builder() -> ExportOptionsBuilder {
        ExportOptionsBuilder::default()
    }
}

/// Builder for ExportOptions
#[derive(Debug, Default)]
pub struct ExportOptionsBuilder {
    options: ExportOptions,
}

impl ExportOptionsBuilder {
    /// Set page geometry
    #[must_use]
    pub fn page(mut self, page: PageGeometry) -> Self {
        self.options.page = page;
        self
    }

    /// Set page margin in millimetres
    #[must_use]
    pub fn margin(mut self, margin: f32) -> Self {
        self.options.page.margin = margin;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_dir = dir.into();
        self
    }

    /// Set base directory for relative image paths
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.base_dir = dir.into();
        self
    }

    /// Set rasterization scale (clamped to 0.5-4)
    #[must_use]
    pub fn raster_scale(mut self, scale: f32) -> Self {
        self.options.raster_scale = scale.clamp(0.5, 4.0);
        self
    }

    /// Set JPEG quality (clamped to 1-100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.options.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set body text size in points (clamped to 6-24)
    #[must_use]
    pub fn body_size(mut self, size: f32) -> Self {
        self.options.body_size = size.clamp(6.0, 24.0);
        self
    }

    /// Set theme
    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.options.theme = theme;
        self
    }

    /// Add a font directory
    #[must_use]
    pub fn font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.font_dirs.push(dir.into());
        self
    }

    /// Enable or disable system font loading
    #[must_use]
    pub fn system_fonts(mut self, enabled: bool) -> Self {
        self.options.system_fonts = enabled;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ExportOptions {
        self.options
    }
}

// ============================================================
// Results
// ============================================================

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    /// Written file
    pub path: PathBuf,
    /// Number of pages
    pub pages: usize,
    /// Number of blocks laid out
    pub blocks: usize,
    /// Number of blocks that used a fallback rendering
    pub fallbacks: usize,
    /// File size in bytes
    pub bytes: usize,
}

/// Result of an export trigger
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// A PDF was written
    Exported(ExportReport),
    /// Another export was already running; nothing happened
    Ignored,
}
