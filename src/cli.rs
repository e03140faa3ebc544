//! Command-line interface definitions

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::CliOverrides;
use crate::direction::DirectionMode;
use crate::interact::{GestureBinding, InteractError};

/// Markdown previewer with paginated PDF export
#[derive(Debug, Parser)]
#[command(name = "markview-pdf")]
#[command(version, about = "Render markdown and export it as a paginated PDF", long_about = None)]
#[command(after_help = "EXAMPLES:
    markview-pdf export notes.md -o out/
    markview-pdf export notes.md --gesture mermaid-0=zoom-in --hold mermaid-0=pan-left:600
    markview-pdf render notes.md --direction auto
    cat notes.md | markview-pdf detect")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render markdown to HTML
    Render(RenderArgs),
    /// Export markdown to PDF
    Export(ExportArgs),
    /// Detect text direction and language
    Detect(InputArgs),
    /// Show, set or list themes
    Theme(ThemeArgs),
    /// Copy a code block to the clipboard
    Copy(CopyArgs),
    /// Show environment and config information
    Info,
}

/// Markdown input; `-` or nothing reads stdin
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,
}

impl InputArgs {
    /// File path, or None for stdin
    pub fn path(&self) -> Option<&Path> {
        self.input.as_deref().filter(|p| p.as_os_str() != "-")
    }
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write HTML here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Text direction: ltr, rtl or auto
    #[arg(long)]
    pub direction: Option<DirectionMode>,

    /// Theme id
    #[arg(long)]
    pub theme: Option<String>,

    /// Leave code blocks without copy buttons
    #[arg(long)]
    pub no_copy_buttons: bool,

    /// Config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output directory
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Page margin in millimetres
    #[arg(long)]
    pub margin: Option<f32>,

    /// Rasterization scale for code and diagram images
    #[arg(long)]
    pub scale: Option<f32>,

    /// JPEG quality for embedded images (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Body text size in points
    #[arg(long)]
    pub body_size: Option<f32>,

    /// Text direction: ltr, rtl or auto
    #[arg(long)]
    pub direction: Option<DirectionMode>,

    /// Theme id
    #[arg(long)]
    pub theme: Option<String>,

    /// Extra font directory (repeatable)
    #[arg(long = "font-dir")]
    pub font_dirs: Vec<PathBuf>,

    /// Do not load system fonts
    #[arg(long)]
    pub no_system_fonts: bool,

    /// Apply a diagram gesture before export, e.g. mermaid-0=zoom-in (repeatable)
    #[arg(long = "gesture", value_name = "ID=GESTURE")]
    pub gestures: Vec<GestureBinding>,

    /// Hold a diagram control, e.g. mermaid-0=zoom-in:450 (repeatable)
    #[arg(long = "hold", value_name = "ID=GESTURE:MILLIS")]
    pub holds: Vec<HoldSpec>,
}

impl ExportArgs {
    /// Overrides for values given on the command line. The theme is
    /// resolved by the caller.
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            margin: self.margin,
            output_dir: self.output_dir.clone(),
            base_dir: self
                .input
                .path()
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf),
            raster_scale: self.scale,
            jpeg_quality: self.quality,
            body_size: self.body_size,
            direction: self.direction,
            theme: None,
            font_dirs: self.font_dirs.clone(),
            system_fonts: self.no_system_fonts.then_some(false),
        }
    }
}

#[derive(Debug, Args)]
pub struct ThemeArgs {
    #[command(subcommand)]
    pub action: ThemeAction,
}

#[derive(Debug, Subcommand)]
pub enum ThemeAction {
    /// Show the current theme
    Get {
        /// Prefer the dark theme when nothing is saved
        #[arg(long)]
        dark: bool,
    },
    /// Save a theme
    Set { name: String },
    /// List themes
    List,
}

#[derive(Debug, Args)]
pub struct CopyArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Zero-based code block index
    #[arg(short, long, default_value_t = 0)]
    pub block: usize,
}

/// A held diagram control: binding plus hold duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldSpec {
    pub binding: GestureBinding,
    pub duration: Duration,
}

impl FromStr for HoldSpec {
    type Err = InteractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (binding, millis) = s
            .rsplit_once(':')
            .ok_or_else(|| InteractError::InvalidBinding(s.to_string()))?;
        let millis: u64 = millis
            .trim()
            .parse()
            .map_err(|_| InteractError::InvalidBinding(s.to_string()))?;
        Ok(Self {
            binding: binding.parse()?,
            duration: Duration::from_millis(millis),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interact::{Gesture, ZoomDirection};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_args() {
        let cli = Cli::try_parse_from([
            "markview-pdf",
            "export",
            "docs/notes.md",
            "-o",
            "out",
            "--gesture",
            "mermaid-0=zoom-in",
            "--hold",
            "mermaid-1=pan-left:300",
            "--direction",
            "auto",
            "--no-system-fonts",
        ])
        .unwrap();
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.gestures[0].gesture, Gesture::Zoom(ZoomDirection::In));
        assert_eq!(args.holds[0].binding.diagram_id, "mermaid-1");
        assert_eq!(args.holds[0].duration, Duration::from_millis(300));

        let overrides = args.overrides();
        assert_eq!(overrides.output_dir, Some(PathBuf::from("out")));
        assert_eq!(overrides.base_dir, Some(PathBuf::from("docs")));
        assert_eq!(overrides.direction, Some(DirectionMode::Auto));
        assert_eq!(overrides.system_fonts, Some(false));
    }

    #[test]
    fn test_bad_gesture_rejected() {
        assert!(Cli::try_parse_from(["markview-pdf", "export", "--gesture", "mermaid-0=spin"]).is_err());
        assert!(Cli::try_parse_from(["markview-pdf", "export", "--hold", "mermaid-0=zoom-in"]).is_err());
    }

    #[test]
    fn test_stdin_input() {
        assert_eq!(InputArgs { input: None }.path(), None);
        assert_eq!(InputArgs { input: Some("-".into()) }.path(), None);
        assert_eq!(
            InputArgs { input: Some("a.md".into()) }.path(),
            Some(Path::new("a.md"))
        );
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["markview-pdf", "-vv", "info"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_theme_subcommands() {
        let cli = Cli::try_parse_from(["markview-pdf", "theme", "set", "ocean"]).unwrap();
        let Commands::Theme(ThemeArgs { action: ThemeAction::Set { name } }) = cli.command else {
            panic!("expected theme set");
        };
        assert_eq!(name, "ocean");
    }
}
