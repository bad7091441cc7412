//! # Font Management
//!
//! The standard PDF fonts (Helvetica, Times, Courier) and text measurement.
//!
//! Measurement is a capability: layout code only sees the [`TextMetrics`]
//! trait, so a host can plug in its own metrics. [`FontContext`] is the
//! built-in implementation backed by the core font width tables.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use serde::Serialize;

/// Measures text for the layout engine.
///
/// Implementations must be pure: the same input always yields the same
/// width. `Sync` because the batch renderer measures from many threads.
pub trait TextMetrics: Sync {
    /// Width of `text` in points when set in `font` at `size` points.
    fn measure(&self, text: &str, font: StandardFont, size: f64) -> f64;
}

/// The base-14 fonts the engine can draw with, minus the symbol faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Width table for this face.
    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA_METRICS,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD_METRICS,
            Self::TimesRoman | Self::TimesItalic => &metrics::TIMES_ROMAN_METRICS,
            Self::TimesBold | Self::TimesBoldItalic => &metrics::TIMES_BOLD_METRICS,
            Self::Courier
            | Self::CourierBold
            | Self::CourierOblique
            | Self::CourierBoldOblique => &metrics::COURIER_METRICS,
        }
    }
}

/// Text measurement with the built-in standard font tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontContext;

impl FontContext {
    pub fn new() -> Self {
        Self
    }
}

impl TextMetrics for FontContext {
    fn measure(&self, text: &str, font: StandardFont, size: f64) -> f64 {
        font.metrics().measure_string(text, size)
    }
}
