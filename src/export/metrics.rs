//! Standard font metrics and text encoding
//!
//! Export text uses the base-14 PDF fonts, so widths come from the
//! Adobe AFM tables and strings are encoded as WinAnsi.

use super::types::PT_TO_MM;

/// Width used for characters outside the tables (1/1000 em)
const DEFAULT_WIDTH: u16 = 556;
/// Courier advance width (1/1000 em)
const COURIER_WIDTH: u16 = 600;

/// Helvetica widths for ASCII 32..=126
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold widths for ASCII 32..=126
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Font faces used by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
    Mono,
}

impl FontFace {
    /// Every face, in resource order
    pub const ALL: [FontFace; 4] = [
        FontFace::Regular,
        FontFace::Bold,
        FontFace::Oblique,
        FontFace::Mono,
    ];

    /// PDF base font name
    pub fn base_font(&self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
            FontFace::Oblique => "Helvetica-Oblique",
            FontFace::Mono => "Courier",
        }
    }

    /// Page resource name
    pub fn resource(&self) -> &'static str {
        match self {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
            FontFace::Oblique => "F3",
            FontFace::Mono => "F4",
        }
    }

    fn char_width(&self, c: char) -> u16 {
        let table = match self {
            FontFace::Mono => return COURIER_WIDTH,
            FontFace::Bold => &HELVETICA_BOLD,
            FontFace::Regular | FontFace::Oblique => &HELVETICA,
        };
        match c as u32 {
            code @ 32..=126 => table[(code - 32) as usize],
            _ => DEFAULT_WIDTH,
        }
    }
}

/// Rendered width of `text` in millimetres
pub fn text_width(text: &str, face: FontFace, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(face.char_width(c))).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Greedy word wrap to `max_width` millimetres.
///
/// Words wider than a line are broken between characters. Empty input
/// yields no lines.
pub fn wrap_text(text: &str, face: FontFace, size_pt: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate, face, size_pt) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, face, size_pt) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = break_word(word, face, size_pt, max_width);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word(word: &str, face: FontFace, size_pt: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if text_width(&piece, face, size_pt) > max_width && piece.chars().count() > 1 {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Split preformatted text into lines no wider than `max_width`,
/// keeping leading indentation
pub fn wrap_preformatted(text: &str, face: FontFace, size_pt: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.trim_end_matches('\n').split('\n') {
        let line = raw.replace('\t', "    ").trim_end().to_string();
        if line.is_empty() || text_width(&line, face, size_pt) <= max_width {
            lines.push(line);
        } else {
            lines.extend(break_word(&line, face, size_pt, max_width));
        }
    }
    lines
}

/// Longest prefix of `text` fitting in `max_width`
pub fn clip_text(text: &str, face: FontFace, size_pt: f32, max_width: f32) -> String {
    let mut out = String::new();
    for c in text.chars() {
        out.push(c);
        if text_width(&out, face, size_pt) > max_width {
            out.pop();
            break;
        }
    }
    out
}

/// Encode text as WinAnsi; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}
