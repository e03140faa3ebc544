//! Export entry point

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::direction::TextDirection;
use crate::progress::{ExportStage, ProgressCallback};
use crate::render::{Element, RenderedOutput};

use super::blocks::{BlockOutcome, BlockRenderer};
use super::classify::{classify_children, export_surface, BlockKind};
use super::layout::{LaidOutDocument, LayoutEngine};
use super::pdf::PdfWriter;
use super::raster::{Rasterizer, ResvgRasterizer};
use super::types::{ExportError, ExportOptions, ExportOutcome, ExportReport, Result, BUSY_LABEL};

/// File name for an export made on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("markdown-export-{}.pdf", date.format("%Y-%m-%d"))
}

// ============================================================
// Trigger Control
// ============================================================

/// The UI control that starts an export
pub trait ExportControl: Send + Sync {
    fn label(&self) -> String;
    fn set_label(&self, label: &str);
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

/// In-memory button state
#[derive(Debug)]
pub struct ExportButton {
    state: Mutex<(String, bool)>,
}

impl ExportButton {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            state: Mutex::new((label.into(), true)),
        }
    }
}

impl Default for ExportButton {
    fn default() -> Self {
        Self::new("Download PDF")
    }
}

impl ExportControl for ExportButton {
    fn label(&self) -> String {
        self.state
            .lock()
            .map(|s| s.0.clone())
            .unwrap_or_default()
    }

    fn set_label(&self, label: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.0 = label.to_string();
        }
    }

    fn is_enabled(&self) -> bool {
        self.state.lock().map(|s| s.1).unwrap_or(false)
    }

    fn set_enabled(&self, enabled: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.1 = enabled;
        }
    }
}

/// Shows the busy state while alive; restores the control when dropped,
/// including on early return and unwinding
struct ControlGuard<'a, C: ExportControl + ?Sized> {
    control: &'a C,
    label: String,
}

impl<'a, C: ExportControl + ?Sized> ControlGuard<'a, C> {
    fn engage(control: &'a C) -> Self {
        let label = control.label();
        control.set_label(BUSY_LABEL);
        control.set_enabled(false);
        Self { control, label }
    }
}

impl<C: ExportControl + ?Sized> Drop for ControlGuard<'_, C> {
    fn drop(&mut self) {
        self.control.set_label(&self.label);
        self.control.set_enabled(true);
    }
}

/// Holds the exporter's busy flag for one pass
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================
// Exporter
// ============================================================

/// Result of laying out a surface
#[derive(Debug)]
pub struct LayoutPass {
    pub document: LaidOutDocument,
    pub blocks: usize,
    pub fallbacks: usize,
}

/// Paginated PDF exporter
///
/// One pass runs at a time; a trigger while a pass is in flight is
/// ignored.
pub struct PdfExporter<R = ResvgRasterizer> {
    rasterizer: R,
    options: ExportOptions,
    busy: AtomicBool,
}

impl PdfExporter<ResvgRasterizer> {
    pub fn new(options: ExportOptions) -> Self {
        let rasterizer = ResvgRasterizer::new(options.font_dirs.clone(), options.system_fonts)
            .with_background(options.theme.palette().card_bg);
        Self::with_rasterizer(rasterizer, options)
    }
}

impl<R: Rasterizer> PdfExporter<R> {
    pub fn with_rasterizer(rasterizer: R, options: ExportOptions) -> Self {
        Self {
            rasterizer,
            options,
            busy: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// True while a pass is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Export the rendered surface to `markdown-export-<date>.pdf` in the
    /// configured output directory.
    ///
    /// # Errors
    ///
    /// [`ExportError::NoContent`] for an empty surface (no file is
    /// written), [`ExportError::LibraryLoad`] when the rasterization
    /// backend cannot be loaded, and serialization or IO errors. Block
    /// failures never abort the pass.
    pub async fn export<C: ExportControl + ?Sized>(
        &self,
        output: &RenderedOutput,
        control: &C,
        progress: &dyn ProgressCallback,
    ) -> Result<ExportOutcome> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::info!("export already in progress, ignoring trigger");
            return Ok(ExportOutcome::Ignored);
        };

        progress.on_step_start(ExportStage::Preparing);
        if output.is_empty() {
            tracing::warn!("nothing to export");
            return Err(ExportError::NoContent);
        }
        self.options.page.validate()?;

        let _control = ControlGuard::engage(control);

        progress.on_step_start(ExportStage::LoadingBackend);
        self.rasterizer.load().await?;
        progress.on_step_complete(ExportStage::LoadingBackend, "ready");

        progress.on_step_start(ExportStage::LayingOut);
        let surface = export_surface(&output.root);
        let pass = self.lay_out(&surface, output.direction, progress).await;
        progress.on_step_complete(
            ExportStage::LayingOut,
            &format!("{} blocks, {} fallbacks", pass.blocks, pass.fallbacks),
        );

        progress.on_step_start(ExportStage::Writing);
        let mut writer = PdfWriter::new(self.options.jpeg_quality);
        if let Some(title) = document_title(&surface) {
            writer = writer.with_title(title);
        }
        let pages = pass.document.pages;
        let bytes = tokio::task::spawn_blocking(move || writer.write(&pass.document))
            .await
            .map_err(|e| ExportError::Serialization(e.to_string()))??;
        progress.on_step_complete(ExportStage::Writing, &format!("{} bytes", bytes.len()));

        progress.on_step_start(ExportStage::Saving);
        let path = self.output_path();
        tokio::fs::create_dir_all(&self.options.output_dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        progress.on_step_complete(ExportStage::Saving, &path.display().to_string());

        tracing::info!(path = %path.display(), pages, blocks = pass.blocks, "exported PDF");
        progress.on_step_start(ExportStage::Completed);

        Ok(ExportOutcome::Exported(ExportReport {
            path,
            pages,
            blocks: pass.blocks,
            fallbacks: pass.fallbacks,
            bytes: bytes.len(),
        }))
    }

    /// Lay out the direct children of `root`, strictly in order. Each
    /// block finishes, including any rasterization, before the next one
    /// starts.
    pub async fn lay_out(
        &self,
        root: &Element,
        direction: TextDirection,
        progress: &dyn ProgressCallback,
    ) -> LayoutPass {
        let blocks = classify_children(root);
        let renderer = BlockRenderer::new(&self.rasterizer, &self.options);
        let mut engine = LayoutEngine::new(self.options.page, direction);
        let mut fallbacks = 0;

        for block in &blocks {
            if let BlockOutcome::Fallback(reason) = renderer.render(&mut engine, block).await {
                fallbacks += 1;
                progress.on_debug(&format!(
                    "block {} ({}) used fallback: {}",
                    block.index,
                    block.kind.name(),
                    reason
                ));
            }
            progress.on_step_progress(block.index + 1, blocks.len());
        }

        LayoutPass {
            document: engine.finish(),
            blocks: blocks.len(),
            fallbacks,
        }
    }

    fn output_path(&self) -> PathBuf {
        self.options
            .output_dir
            .join(export_file_name(chrono::Utc::now().date_naive()))
    }
}

/// Text of the first level-one heading
fn document_title(root: &Element) -> Option<String> {
    classify_children(root)
        .into_iter()
        .find_map(|block| match block.kind {
            BlockKind::Heading { level: 1, text } if !text.trim().is_empty() => Some(text),
            _ => None,
        })
}
