//! Theme selection and persistence
//!
//! Themes form a fixed set. The active theme id is persisted under the
//! `theme` key of a small JSON key-value file, mirroring browser local
//! storage. Its palette colours diagrams and the tinted areas of the PDF.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key holding the theme id
pub const THEME_KEY: &str = "theme";

// ============================================================
// Error Types
// ============================================================

/// Theme storage error types
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Unknown theme '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownTheme {
        name: String,
        suggestion: Option<&'static str>,
    },

    #[error("No data directory available for theme storage")]
    NoStorageDir,

    #[error("Corrupt storage file {path}: {message}")]
    CorruptStore { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn suggestion_suffix(suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ThemeError>;

// ============================================================
// Palette
// ============================================================

/// An sRGB colour with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb` or `#rgb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let parse = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            6 => Some(Rgb(
                parse(&digits[0..2])?,
                parse(&digits[2..4])?,
                parse(&digits[4..6])?,
            )),
            3 => {
                let expand = |i: usize| parse(&digits[i..i + 1]).map(|v| v * 17);
                Some(Rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    /// `#rrggbb` form
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Linear blend towards `other` (`t` = 0 keeps self)
    pub fn mix(&self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(lerp(self.0, other.0), lerp(self.1, other.1), lerp(self.2, other.2))
    }

    /// Channels scaled to 0.0-1.0
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }

    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

/// Colour variables of a theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Rgb,
    pub text: Rgb,
    pub border: Rgb,
    pub card_bg: Rgb,
    pub code_bg: Rgb,
    pub code_text: Rgb,
}

// ============================================================
// Theme
// ============================================================

/// Built-in themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Aurora,
    Midnight,
    Ocean,
    Forest,
    Sunset,
}

impl Theme {
    /// Every theme, in menu order
    pub const ALL: [Theme; 5] = [
        Theme::Aurora,
        Theme::Midnight,
        Theme::Ocean,
        Theme::Forest,
        Theme::Sunset,
    ];

    /// Storage id
    pub fn id(&self) -> &'static str {
        match self {
            Theme::Aurora => "aurora",
            Theme::Midnight => "midnight",
            Theme::Ocean => "ocean",
            Theme::Forest => "forest",
            Theme::Sunset => "sunset",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Aurora => "Aurora",
            Theme::Midnight => "Midnight",
            Theme::Ocean => "Ocean",
            Theme::Forest => "Forest",
            Theme::Sunset => "Sunset",
        }
    }

    /// Look up a theme by id
    pub fn from_id(id: &str) -> Option<Theme> {
        let id = id.trim().to_lowercase();
        Theme::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Look up a theme by id, falling back to the default theme
    pub fn from_id_or_default(id: &str) -> Theme {
        Theme::from_id(id).unwrap_or_default()
    }

    /// Strict lookup with a "did you mean" suggestion on failure
    pub fn parse_strict(id: &str) -> Result<Theme> {
        Theme::from_id(id).ok_or_else(|| ThemeError::UnknownTheme {
            name: id.to_string(),
            suggestion: Theme::suggest(id),
        })
    }

    /// Closest theme id to a misspelled name
    pub fn suggest(id: &str) -> Option<&'static str> {
        let id = id.trim().to_lowercase();
        Theme::ALL
            .iter()
            .map(|t| (t.id(), strsim::jaro_winkler(&id, t.id())))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }

    /// Initial theme when nothing has been saved
    pub fn initial(prefers_dark: bool) -> Theme {
        if prefers_dark {
            Theme::Midnight
        } else {
            Theme::Aurora
        }
    }

    /// Colour variables
    pub fn palette(&self) -> Palette {
        match self {
            Theme::Aurora => Palette {
                primary: Rgb(0x4c, 0xaf, 0xef),
                text: Rgb(0x33, 0x33, 0x33),
                border: Rgb(0xe5, 0xe7, 0xeb),
                card_bg: Rgb(0xff, 0xff, 0xff),
                code_bg: Rgb(0x1e, 0x29, 0x3b),
                code_text: Rgb(0xe2, 0xe8, 0xf0),
            },
            Theme::Midnight => Palette {
                primary: Rgb(0x8b, 0x5c, 0xf6),
                text: Rgb(0xe5, 0xe7, 0xeb),
                border: Rgb(0x37, 0x41, 0x51),
                card_bg: Rgb(0x11, 0x18, 0x27),
                code_bg: Rgb(0x0b, 0x10, 0x1a),
                code_text: Rgb(0xd1, 0xd5, 0xdb),
            },
            Theme::Ocean => Palette {
                primary: Rgb(0x06, 0xb6, 0xd4),
                text: Rgb(0x0f, 0x2a, 0x3d),
                border: Rgb(0xbf, 0xdb, 0xe6),
                card_bg: Rgb(0xf0, 0xf9, 0xff),
                code_bg: Rgb(0x0c, 0x4a, 0x6e),
                code_text: Rgb(0xe0, 0xf2, 0xfe),
            },
            Theme::Forest => Palette {
                primary: Rgb(0x22, 0xc5, 0x5e),
                text: Rgb(0x1a, 0x2e, 0x1f),
                border: Rgb(0xc6, 0xe0, 0xcb),
                card_bg: Rgb(0xf7, 0xfc, 0xf7),
                code_bg: Rgb(0x14, 0x53, 0x2d),
                code_text: Rgb(0xdc, 0xfc, 0xe7),
            },
            Theme::Sunset => Palette {
                primary: Rgb(0xf9, 0x73, 0x16),
                text: Rgb(0x43, 0x14, 0x07),
                border: Rgb(0xfe, 0xd7, 0xaa),
                card_bg: Rgb(0xff, 0xf7, 0xed),
                code_bg: Rgb(0x7c, 0x2d, 0x12),
                code_text: Rgb(0xff, 0xed, 0xd5),
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Theme: {}", self.label())
    }
}

// ============================================================
// Key-value storage
// ============================================================

/// JSON-backed string key-value store
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl KeyValueStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| ThemeError::CorruptStore {
                    path: path.clone(),
                    message: e.to_string(),
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Open the store in the user data directory
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path().ok_or(ThemeError::NoStorageDir)?)
    }

    /// Default location: `<data dir>/markview-pdf/storage.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("markview-pdf").join("storage.json"))
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a value and write the file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            ThemeError::CorruptStore {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Persisted theme selection
#[derive(Debug, Clone)]
pub struct ThemeStore {
    store: KeyValueStore,
}

impl ThemeStore {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Saved theme, or the initial theme for the colour-scheme preference.
    /// Unknown saved ids fall back to the default theme.
    pub fn current(&self, prefers_dark: bool) -> Theme {
        match self.store.get(THEME_KEY) {
            Some(id) => Theme::from_id_or_default(id),
            None => Theme::initial(prefers_dark),
        }
    }

    /// Apply and persist a theme id; unknown ids persist the default theme
    pub fn set(&mut self, id: &str) -> Result<Theme> {
        let theme = Theme::from_id_or_default(id);
        self.store.set(THEME_KEY, theme.id())?;
        tracing::debug!(theme = theme.id(), "theme saved");
        Ok(theme)
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_theme_ids_round_trip() {
        for theme in Theme::ALL {
            assert_eq!(Theme::from_id(theme.id()), Some(theme));
        }
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        assert_eq!(Theme::from_id_or_default("neon"), Theme::Aurora);
    }

    #[test]
    fn test_suggestion() {
        assert_eq!(Theme::suggest("ocaen"), Some("ocean"));
        assert_eq!(Theme::suggest("zzzzzz"), None);

        let err = Theme::parse_strict("midnite").unwrap_err();
        assert!(err.to_string().contains("did you mean 'midnight'"));
    }

    #[test]
    fn test_initial_theme() {
        assert_eq!(Theme::initial(true), Theme::Midnight);
        assert_eq!(Theme::initial(false), Theme::Aurora);
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgb::from_hex("#4cafef"), Some(Rgb(0x4c, 0xaf, 0xef)));
        assert_eq!(Rgb::from_hex("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("4cafef"), None);
        assert_eq!(Rgb(1, 2, 255).to_hex(), "#0102ff");
    }

    #[test]
    fn test_mix() {
        assert_eq!(Rgb::BLACK.mix(Rgb::WHITE, 0.0), Rgb::BLACK);
        assert_eq!(Rgb::BLACK.mix(Rgb::WHITE, 1.0), Rgb::WHITE);
    }

    #[test]
    fn test_theme_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = ThemeStore::new(KeyValueStore::open(&path).unwrap());
        assert_eq!(store.current(true), Theme::Midnight);
        assert_eq!(store.set("forest").unwrap(), Theme::Forest);

        let reopened = ThemeStore::new(KeyValueStore::open(&path).unwrap());
        assert_eq!(reopened.current(true), Theme::Forest);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"theme\": \"forest\""));
    }

    #[test]
    fn test_theme_store_unknown_saved_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"theme": "neon"}"#).unwrap();

        let store = ThemeStore::new(KeyValueStore::open(&path).unwrap());
        assert_eq!(store.current(false), Theme::Aurora);
    }

    #[test]
    fn test_corrupt_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            KeyValueStore::open(&path),
            Err(ThemeError::CorruptStore { .. })
        ));
    }
}
