//! Text direction and language-family detection
//!
//! # Overview
//!
//! Decides whether rendered markdown should flow right-to-left by counting
//! characters from the Arabic, Persian and Hebrew blocks against Latin
//! letters. A minimum RTL count keeps short quotations from flipping a
//! mostly-Latin document.
//!
//! # Example
//!
//! ```
//! use markview_pdf::{detect_language, detect_text_direction, TextDirection};
//!
//! let text = "שלום עולם, זהו מסמך בעברית";
//! assert_eq!(detect_text_direction(text), TextDirection::Rtl);
//! assert_eq!(detect_language(text), "Hebrew");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum number of RTL characters before a document is treated as RTL
pub const MIN_RTL_CHARS: usize = 10;

const ARABIC_RANGES: [(u32, u32); 5] = [
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

const HEBREW_RANGES: [(u32, u32); 2] = [(0x0590, 0x05FF), (0xFB1D, 0xFB4F)];

/// Letters specific to Persian (ک گ ی پ چ ژ)
const PERSIAN_CHARS: [char; 6] = ['\u{06A9}', '\u{06AF}', '\u{06CC}', '\u{067E}', '\u{0686}', '\u{0698}'];

/// Resolved text direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    /// Left-to-right
    #[default]
    Ltr,
    /// Right-to-left
    Rtl,
}

impl TextDirection {
    /// Lowercase name, used as the output surface class
    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction selection made by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionMode {
    /// Always left-to-right
    #[default]
    Ltr,
    /// Always right-to-left
    Rtl,
    /// Detect from the input text
    Auto,
}

impl FromStr for DirectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ltr" => Ok(DirectionMode::Ltr),
            "rtl" => Ok(DirectionMode::Rtl),
            "auto" => Ok(DirectionMode::Auto),
            other => Err(format!("unknown direction mode '{}' (expected ltr, rtl or auto)", other)),
        }
    }
}

/// Result of resolving a [`DirectionMode`] against some text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionReport {
    /// Direction applied to the output surface
    pub direction: TextDirection,
    /// Human-readable indicator, e.g. `Language: Hebrew (Auto: RTL)`
    pub indicator: String,
}

impl DirectionMode {
    /// Resolve the mode for `text`
    pub fn resolve(&self, text: &str) -> DirectionReport {
        match self {
            DirectionMode::Ltr => DirectionReport {
                direction: TextDirection::Ltr,
                indicator: "Language: Manual LTR".to_string(),
            },
            DirectionMode::Rtl => DirectionReport {
                direction: TextDirection::Rtl,
                indicator: "Language: Manual RTL".to_string(),
            },
            DirectionMode::Auto => {
                let direction = detect_text_direction(text);
                DirectionReport {
                    direction,
                    indicator: format!(
                        "Language: {} (Auto: {})",
                        detect_language(text),
                        direction.as_str().to_uppercase()
                    ),
                }
            }
        }
    }
}

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let code = c as u32;
    ranges.iter().any(|&(lo, hi)| code >= lo && code <= hi)
}

fn is_arabic(c: char) -> bool {
    in_ranges(c, &ARABIC_RANGES)
}

fn is_hebrew(c: char) -> bool {
    in_ranges(c, &HEBREW_RANGES)
}

fn is_persian(c: char) -> bool {
    PERSIAN_CHARS.contains(&c)
}

/// Latin letters including the Latin-1 supplement and Latin Extended-A/B
fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic() || in_ranges(c, &[(0x00C0, 0x024F)])
}

/// Character counts used by the direction heuristic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCounts {
    /// Persian-specific letters
    pub persian: usize,
    /// Hebrew block characters
    pub hebrew: usize,
    /// Arabic block characters (Persian letters live here too)
    pub arabic: usize,
    /// Latin letters
    pub latin: usize,
}

impl ScriptCounts {
    /// Count script membership for every character of `text`
    pub fn scan(text: &str) -> Self {
        let mut counts = ScriptCounts::default();
        for c in text.chars() {
            if is_persian(c) {
                counts.persian += 1;
            }
            if is_hebrew(c) {
                counts.hebrew += 1;
            }
            if is_arabic(c) {
                counts.arabic += 1;
            }
            if is_latin(c) {
                counts.latin += 1;
            }
        }
        counts
    }

    /// RTL score; Persian letters are counted on top of their Arabic
    /// block membership
    pub fn rtl(&self) -> usize {
        self.persian + self.hebrew + self.arabic
    }
}

/// Detect whether text should flow right-to-left
pub fn detect_text_direction(text: &str) -> TextDirection {
    if text.is_empty() {
        return TextDirection::Ltr;
    }

    let counts = ScriptCounts::scan(text);
    let rtl = counts.rtl();

    if rtl > counts.latin && rtl >= MIN_RTL_CHARS {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}

/// Detect the dominant language family of the text
pub fn detect_language(text: &str) -> &'static str {
    if text.is_empty() {
        return "Unknown";
    }

    if text.chars().any(is_persian) {
        return "Persian/Farsi";
    }
    if text.chars().any(is_hebrew) {
        return "Hebrew";
    }
    if text.chars().any(is_arabic) {
        return "Arabic";
    }
    if text.chars().any(|c| c.is_ascii_alphabetic()) {
        return "Latin-based (EN/ES/FR/etc.)";
    }

    "Mixed/Unknown"
}
