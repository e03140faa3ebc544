//! Configuration file support
//!
//! Settings come from a TOML file: `./markview.toml`, then
//! `<config dir>/markview-pdf/config.toml`, then built-in defaults.
//! Command-line values are merged on top and always win.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::direction::DirectionMode;
use crate::export::{
    ExportOptions, PageGeometry, A4_HEIGHT_MM, A4_WIDTH_MM, DEFAULT_BODY_SIZE_PT,
    DEFAULT_JPEG_QUALITY, DEFAULT_MARGIN_MM, DEFAULT_RASTER_SCALE,
};
use crate::render::RenderOptions;
use crate::theme::Theme;

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "markview.toml";
/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "markview-pdf";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// Sections
// ============================================================

/// `[page]` section, millimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            width: A4_WIDTH_MM,
            height: A4_HEIGHT_MM,
            margin: DEFAULT_MARGIN_MM,
        }
    }
}

/// `[export]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub raster_scale: f32,
    pub jpeg_quality: u8,
    pub body_size: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            raster_scale: DEFAULT_RASTER_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            body_size: DEFAULT_BODY_SIZE_PT,
        }
    }
}

/// `[render]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub direction: DirectionMode,
    pub theme: Theme,
    pub copy_buttons: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            direction: DirectionMode::default(),
            theme: Theme::default(),
            copy_buttons: true,
        }
    }
}

/// `[fonts]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    pub dirs: Vec<PathBuf>,
    pub system: bool,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            system: true,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub page: PageConfig,
    pub export: ExportConfig,
    pub render: RenderConfig,
    pub fonts: FontsConfig,
}

impl Config {
    /// Load from the first config file found, or defaults
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.is_file() {
                tracing::info!(path = %path.display(), "loading config");
                return Self::load_from_path(&path);
            }
        }
        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Config file locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Merge command-line overrides (CLI wins)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> MergedConfig {
        let page = PageGeometry {
            width: self.page.width,
            height: self.page.height,
            margin: cli.margin.unwrap_or(self.page.margin),
        };

        let mut export = ExportOptions::builder()
            .page(page)
            .output_dir(cli.output_dir.clone().unwrap_or_else(|| self.export.output_dir.clone()))
            .raster_scale(cli.raster_scale.unwrap_or(self.export.raster_scale))
            .jpeg_quality(cli.jpeg_quality.unwrap_or(self.export.jpeg_quality))
            .body_size(cli.body_size.unwrap_or(self.export.body_size))
            .theme(cli.theme.unwrap_or(self.render.theme))
            .system_fonts(cli.system_fonts.unwrap_or(self.fonts.system));
        if let Some(base) = &cli.base_dir {
            export = export.base_dir(base.clone());
        }
        for dir in self.fonts.dirs.iter().chain(&cli.font_dirs) {
            export = export.font_dir(dir.clone());
        }

        let render = RenderOptions::builder()
            .direction(cli.direction.unwrap_or(self.render.direction))
            .theme(cli.theme.unwrap_or(self.render.theme))
            .copy_buttons(self.render.copy_buttons)
            .build();

        MergedConfig {
            export: export.build(),
            render,
        }
    }
}

/// Command-line values that override the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub margin: Option<f32>,
    pub output_dir: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub raster_scale: Option<f32>,
    pub jpeg_quality: Option<u8>,
    pub body_size: Option<f32>,
    pub direction: Option<DirectionMode>,
    pub theme: Option<Theme>,
    /// Appended to the configured font directories
    pub font_dirs: Vec<PathBuf>,
    pub system_fonts: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Options ready for the render session and the exporter
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub export: ExportOptions,
    pub render: RenderOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page.margin, 15.0);
        assert_eq!(config.page.width, 210.0);
        assert_eq!(config.render.theme, Theme::Aurora);
        assert!(config.fonts.system);

        let merged = config.merge_with_cli(&CliOverrides::new());
        assert_eq!(merged.export.page, PageGeometry::a4());
        assert_eq!(merged.render.direction, DirectionMode::Ltr);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [page]
            margin = 20.0

            [render]
            direction = "auto"
            theme = "ocean"
            "#,
        )
        .unwrap();
        assert_eq!(config.page.margin, 20.0);
        assert_eq!(config.page.height, 297.0);
        assert_eq!(config.render.direction, DirectionMode::Auto);
        assert_eq!(config.render.theme, Theme::Ocean);
        assert_eq!(config.export.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }

    #[test]
    fn test_cli_wins() {
        let config = Config::from_toml("[export]\njpeg_quality = 70\n[page]\nmargin = 10.0\n").unwrap();
        let cli = CliOverrides {
            jpeg_quality: Some(85),
            theme: Some(Theme::Forest),
            font_dirs: vec![PathBuf::from("/fonts")],
            ..Default::default()
        };
        let merged = config.merge_with_cli(&cli);
        assert_eq!(merged.export.jpeg_quality, 85);
        assert_eq!(merged.export.page.margin, 10.0);
        assert_eq!(merged.export.theme, Theme::Forest);
        assert_eq!(merged.render.theme, Theme::Forest);
        assert_eq!(merged.export.font_dirs, vec![PathBuf::from("/fonts")]);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"[page\nmargin = ")
            .unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Config::load_from_path(&dir.path().join("missing.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.export.body_size = 12.0;
        config.fonts.dirs.push(PathBuf::from("fonts"));
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
