//! # Style System
//!
//! Field styles as authored (family name, size, bold/italic flags, hex
//! color, alignment) and their resolution into concrete drawing values.
//!
//! Resolution never fails. Unknown families fall back to Helvetica,
//! malformed colors to black, unknown alignments to left. A field with a
//! bad style still renders, just plainer.

use crate::font::StandardFont;
use serde::{Deserialize, Serialize};

/// Horizontal alignment of text within its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Parse an alignment name. Anything unrecognised is `Left`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "izquierda" => Alignment::Left,
            "center" | "centre" | "centro" => Alignment::Center,
            "right" | "derecha" => Alignment::Right,
            "justify" | "justified" | "justificado" => Alignment::Justify,
            other => {
                log::debug!("unknown alignment '{}', using left", other);
                Alignment::Left
            }
        }
    }
}

impl From<String> for Alignment {
    fn from(s: String) -> Self {
        Alignment::parse(&s)
    }
}

/// An RGB color with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Parse `#rgb` or `#rrggbb` (the `#` is optional). Returns `None` for
    /// anything else, including a partially valid string.
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let (r, g, b) = match hex.len() {
            3 => (
                u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?,
                u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?,
                u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?,
            ),
            6 => (
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            ),
            _ => return None,
        };
        Some(Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        })
    }

    /// Parse a hex color, falling back to black.
    pub fn hex(hex: &str) -> Self {
        Self::parse_hex(hex).unwrap_or_else(|| {
            log::debug!("malformed color '{}', using black", hex);
            Color::BLACK
        })
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Typeface families available to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Map an authored family name to a built-in family.
    ///
    /// | Authored name (case-insensitive)                      | Family    |
    /// |-------------------------------------------------------|-----------|
    /// | helvetica, arial, sans-serif, sans                    | Helvetica |
    /// | times, times-roman, times new roman, serif            | Times     |
    /// | courier, courier new, monospace, mono                 | Courier   |
    /// | anything else                                         | Helvetica |
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans-serif" | "sans" => FontFamily::Helvetica,
            "times" | "times-roman" | "times roman" | "times new roman" | "serif" => {
                FontFamily::Times
            }
            "courier" | "courier new" | "monospace" | "mono" => FontFamily::Courier,
            other => {
                log::debug!("unknown font family '{}', using Helvetica", other);
                FontFamily::Helvetica
            }
        }
    }
}

/// Resolve family + bold/italic to a concrete font.
///
/// Pure function; the whole font table lives in this match.
pub fn resolve_font(family: &str, bold: bool, italic: bool) -> StandardFont {
    match (FontFamily::from_name(family), bold, italic) {
        (FontFamily::Helvetica, false, false) => StandardFont::Helvetica,
        (FontFamily::Helvetica, true, false) => StandardFont::HelveticaBold,
        (FontFamily::Helvetica, false, true) => StandardFont::HelveticaOblique,
        (FontFamily::Helvetica, true, true) => StandardFont::HelveticaBoldOblique,
        (FontFamily::Times, false, false) => StandardFont::TimesRoman,
        (FontFamily::Times, true, false) => StandardFont::TimesBold,
        (FontFamily::Times, false, true) => StandardFont::TimesItalic,
        (FontFamily::Times, true, true) => StandardFont::TimesBoldItalic,
        (FontFamily::Courier, false, false) => StandardFont::Courier,
        (FontFamily::Courier, true, false) => StandardFont::CourierBold,
        (FontFamily::Courier, false, true) => StandardFont::CourierOblique,
        (FontFamily::Courier, true, true) => StandardFont::CourierBoldOblique,
    }
}

/// Style of a field as authored in the template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// Hex color, e.g. `#1a1a1a`.
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub alignment: Alignment,
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f64 {
    12.0
}

fn default_color() -> String {
    "#000000".to_string()
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            bold: false,
            italic: false,
            color: default_color(),
            alignment: Alignment::Left,
        }
    }
}

/// Resolved style: concrete font, size, color and alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub font: StandardFont,
    pub font_size: f64,
    pub color: Color,
    pub alignment: Alignment,
}

impl FieldStyle {
    pub fn resolve(&self) -> ResolvedStyle {
        ResolvedStyle {
            font: resolve_font(&self.font_family, self.bold, self.italic),
            font_size: self.font_size,
            color: Color::hex(&self.color),
            alignment: self.alignment,
        }
    }
}
