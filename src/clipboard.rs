//! Clipboard copy for code blocks
//!
//! Copying tries a primary backend and then a fallback. The copy button
//! shows the outcome and returns to its idle label after a short delay.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

/// Delay before a copy button returns to its idle label
pub const COPY_RESET_DELAY: Duration = Duration::from_millis(1200);

/// Clipboard commands probed in order: program and arguments
pub const KNOWN_COMMANDS: [(&str, &[&str]); 4] = [
    ("wl-copy", &[]),
    ("pbcopy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Clipboard error types
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("No clipboard backend available")]
    NoBackend,

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClipboardError>;

/// A place text can be copied to
pub trait ClipboardBackend: Send + Sync {
    fn name(&self) -> &str;
    fn write_text(&self, text: &str) -> Result<()>;
}

// ============================================================
// Backends
// ============================================================

/// Pipes text into an external clipboard command
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandClipboard {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
            name,
        }
    }

    /// Every known clipboard command found on `PATH`, in probe order
    pub fn detect_all() -> Vec<Self> {
        KNOWN_COMMANDS
            .iter()
            .filter_map(|(cmd, args)| which::which(cmd).ok().map(|path| Self::new(path, args)))
            .collect()
    }
}

impl ClipboardBackend for CommandClipboard {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        // stdin is dropped before waiting so the command sees end of input
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::CommandFailed {
                command: self.name.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Backend that is never available
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl ClipboardBackend for Unavailable {
    fn name(&self) -> &str {
        "none"
    }

    fn write_text(&self, _text: &str) -> Result<()> {
        Err(ClipboardError::NoBackend)
    }
}

/// In-memory clipboard
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}

// ============================================================
// Copy
// ============================================================

/// Outcome of a copy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    Copied,
    Failed,
}

/// Copy `text` with `primary`, falling back to `fallback` on failure
pub fn copy_code(
    text: &str,
    primary: &dyn ClipboardBackend,
    fallback: &dyn ClipboardBackend,
) -> CopyStatus {
    match primary.write_text(text) {
        Ok(()) => return CopyStatus::Copied,
        Err(e) => tracing::debug!(backend = primary.name(), "primary clipboard failed: {}", e),
    }
    match fallback.write_text(text) {
        Ok(()) => CopyStatus::Copied,
        Err(e) => {
            tracing::warn!(backend = fallback.name(), "clipboard copy failed: {}", e);
            CopyStatus::Failed
        }
    }
}

/// Copy button label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyLabel {
    #[default]
    Copy,
    Copied,
    Failed,
}

impl fmt::Display for CopyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CopyLabel::Copy => "Copy",
            CopyLabel::Copied => "Copied",
            CopyLabel::Failed => "Failed",
        })
    }
}

impl From<CopyStatus> for CopyLabel {
    fn from(status: CopyStatus) -> Self {
        match status {
            CopyStatus::Copied => CopyLabel::Copied,
            CopyStatus::Failed => CopyLabel::Failed,
        }
    }
}

/// A code block's copy button
///
/// Must be used inside a tokio runtime; the label reset runs as a task.
#[derive(Debug, Default)]
pub struct CopyButton {
    label: Arc<Mutex<CopyLabel>>,
    reset: Option<JoinHandle<()>>,
}

impl CopyButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self) -> CopyLabel {
        *self.label.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy `text` and show the outcome until the reset delay elapses
    pub fn click(
        &mut self,
        text: &str,
        primary: &dyn ClipboardBackend,
        fallback: &dyn ClipboardBackend,
    ) -> CopyStatus {
        let status = copy_code(text, primary, fallback);
        self.show(status.into());
        status
    }

    fn show(&mut self, label: CopyLabel) {
        if let Some(handle) = self.reset.take() {
            handle.abort();
        }
        *self.label.lock().unwrap_or_else(PoisonError::into_inner) = label;

        let shared = Arc::clone(&self.label);
        let deadline = tokio::time::Instant::now() + COPY_RESET_DELAY;
        self.reset = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            *shared.lock().unwrap_or_else(PoisonError::into_inner) = CopyLabel::Copy;
        }));
    }
}

impl Drop for CopyButton {
    fn drop(&mut self) {
        if let Some(handle) = self.reset.take() {
            handle.abort();
        }
    }
}
