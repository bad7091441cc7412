//! # Field Layout Engine
//!
//! Turns one field plus one record into draw commands in page space.
//!
//! ## Pipeline
//!
//! ```text
//! FieldDescriptor + DataRecord
//!       ↓
//!   [resolve]  : content kind → string
//!       ↓
//!   [text]     : greedy wrap (multi-line) or one line (single-line)
//!       ↓
//!   [justify]  : per-word x offsets
//!       ↓
//!   mm → pt, top-left → bottom-left flip
//!       ↓
//!   Vec<DrawCommand>
//! ```
//!
//! ## Coordinates
//!
//! Templates are authored in millimetres with the origin at the page's top
//! left. PDF user space is points with the origin at the bottom left. A box
//! at `(x, y, w, h)` mm becomes `(x·k, H − y·k − h·k, w·k, h·k)` with
//! `k = 2.834645` and `H` the page height in points.
//!
//! ## Single- vs multi-line
//!
//! A field wraps when its box is taller than one and a half times the font
//! size (`height_pt > font_size * 1.5`); otherwise the whole text is set on
//! one line and may overflow the box. Wrapped blocks use a line height of
//! `1.2 × font_size` and are centered vertically when they are shorter than
//! the box, top-aligned otherwise.
//!
//! The engine holds no state between calls and may be shared across
//! threads.

pub mod table;

use serde::Serialize;

use crate::error::FieldError;
use crate::font::{StandardFont, TextMetrics};
use crate::model::{ContentKind, DataRecord, FieldDescriptor, MAX_PAGES};
use crate::resolve::resolve;
use crate::style::{Alignment, Color, ResolvedStyle};
use crate::text::{break_lines, layout_line, single_line, Measurer, PlacedWord};

/// Points per millimetre.
pub const MM_TO_PT: f64 = 2.834645;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

/// Boxes taller than this many font sizes wrap their text.
pub const MULTI_LINE_THRESHOLD: f64 = 1.5;

/// Baseline of single-line text below the box top, in font sizes.
pub const SINGLE_LINE_BASELINE: f64 = 0.7;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

/// A drawing primitive in PDF user space (points, bottom-left origin).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    /// Draw one word with its baseline starting at `(x, y)`.
    Text {
        text: String,
        x: f64,
        y: f64,
        font: StandardFont,
        size: f64,
        color: Color,
    },
    /// Draw a rectangle whose lower-left corner is `(x, y)`.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        stroke: Option<Color>,
        fill: Option<Color>,
    },
    /// Draw `children` clipped to a rectangle.
    Clip {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        children: Vec<DrawCommand>,
    },
}

/// A field box in points: left edge, distance of the top edge from the
/// page top, width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxPt {
    pub x: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxPt {
    pub fn from_field(field: &FieldDescriptor) -> Self {
        Self {
            x: mm_to_pt(field.x),
            top: mm_to_pt(field.y),
            width: mm_to_pt(field.width),
            height: mm_to_pt(field.height),
        }
    }

    /// Lower edge of the box in PDF space.
    pub fn pdf_y(&self, page_height: f64) -> f64 {
        page_height - self.top - self.height
    }
}

/// Lays out fields for one page size.
pub struct FieldLayoutEngine<'a> {
    metrics: &'a dyn TextMetrics,
    page_height: f64,
    record_key: &'a str,
}

impl<'a> FieldLayoutEngine<'a> {
    pub fn new(metrics: &'a dyn TextMetrics, page_height: f64) -> Self {
        Self {
            metrics,
            page_height,
            record_key: "",
        }
    }

    /// Tag log messages with the record being rendered.
    pub fn with_record_key(mut self, key: &'a str) -> Self {
        self.record_key = key;
        self
    }

    pub fn page_height(&self) -> f64 {
        self.page_height
    }

    pub(crate) fn record_key(&self) -> &str {
        self.record_key
    }

    /// Lay out any field, dispatching tables to the table engine.
    pub fn layout(
        &self,
        field: &FieldDescriptor,
        record: &DataRecord,
    ) -> Result<Vec<DrawCommand>, FieldError> {
        match &field.content {
            ContentKind::Table(spec) => {
                validate(field)?;
                table::layout_table(self, field, spec, record)
            }
            _ => self.layout_field(field, record),
        }
    }

    /// Lay out a text field (literal, bound or composite).
    ///
    /// Empty text produces no commands.
    pub fn layout_field(
        &self,
        field: &FieldDescriptor,
        record: &DataRecord,
    ) -> Result<Vec<DrawCommand>, FieldError> {
        validate(field)?;
        let text = resolve(&field.content, record).map_err(|source| FieldError::Resolve {
            field: field.name.clone(),
            source,
        })?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let bx = BoxPt::from_field(field);
        let style = field.style.resolve();
        let placed = self.place_text(&text, &bx, &style);
        log::debug!(
            "field '{}' (record {}): {} words placed",
            field.name,
            self.record_key,
            placed.len()
        );
        Ok(self.to_commands(&placed, &bx, &style))
    }

    /// Position the words of `text` inside `bx`.
    pub fn place_text(&self, text: &str, bx: &BoxPt, style: &ResolvedStyle) -> Vec<PlacedWord> {
        if bx.height > style.font_size * MULTI_LINE_THRESHOLD {
            self.place_multi_line(text, bx, style)
        } else {
            self.place_single_line(text, bx.width, style.font, style.font_size, style.alignment)
        }
    }

    fn place_multi_line(&self, text: &str, bx: &BoxPt, style: &ResolvedStyle) -> Vec<PlacedWord> {
        let measure = Measurer::new(self.metrics, style.font, style.font_size);
        let space_width = measure.space_width();
        let lines = break_lines(text, bx.width, &measure);
        if lines.is_empty() {
            return Vec::new();
        }

        let line_height = style.font_size * LINE_HEIGHT;
        let block_height = line_height * lines.len() as f64;
        let top_offset = if block_height < bx.height {
            (bx.height - block_height) / 2.0
        } else {
            0.0
        };

        let last = lines.len() - 1;
        let mut placed = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let baseline = top_offset + line_height * i as f64 + style.font_size;
            placed.extend(
                layout_line(line, bx.width, style.alignment, space_width, i == last)
                    .into_iter()
                    .map(|mut p| {
                        p.y_offset = baseline;
                        p
                    }),
            );
        }
        placed
    }

    /// Set `text` on one line of `width` points. Justify is treated as
    /// left: a single physical line has nothing to stretch against.
    pub(crate) fn place_single_line(
        &self,
        text: &str,
        width: f64,
        font: StandardFont,
        font_size: f64,
        alignment: Alignment,
    ) -> Vec<PlacedWord> {
        let measure = Measurer::new(self.metrics, font, font_size);
        let Some(line) = single_line(text, &measure) else {
            return Vec::new();
        };
        let alignment = match alignment {
            Alignment::Justify => Alignment::Left,
            other => other,
        };
        let baseline = font_size * SINGLE_LINE_BASELINE;
        layout_line(&line, width, alignment, measure.space_width(), true)
            .into_iter()
            .map(|mut p| {
                p.y_offset = baseline;
                p
            })
            .collect()
    }

    /// Convert box-relative words into page-space text commands.
    pub fn to_commands(
        &self,
        placed: &[PlacedWord],
        bx: &BoxPt,
        style: &ResolvedStyle,
    ) -> Vec<DrawCommand> {
        placed
            .iter()
            .map(|p| DrawCommand::Text {
                text: p.word.clone(),
                x: bx.x + p.x_offset,
                y: self.page_height - (bx.top + p.y_offset),
                font: style.font,
                size: style.font_size,
                color: style.color,
            })
            .collect()
    }
}

fn validate(field: &FieldDescriptor) -> Result<(), FieldError> {
    let invalid = |reason: String| FieldError::InvalidGeometry {
        field: field.name.clone(),
        reason,
    };
    if !(field.width > 0.0 && field.width.is_finite()) {
        return Err(invalid(format!("width must be positive, got {}", field.width)));
    }
    if !(field.height > 0.0 && field.height.is_finite()) {
        return Err(invalid(format!("height must be positive, got {}", field.height)));
    }
    if !(field.style.font_size > 0.0 && field.style.font_size.is_finite()) {
        return Err(invalid(format!(
            "font size must be positive, got {}",
            field.style.font_size
        )));
    }
    if !field.x.is_finite() || !field.y.is_finite() {
        return Err(invalid("position must be finite".to_string()));
    }
    if field.page >= MAX_PAGES {
        return Err(invalid(format!(
            "page {} is past the last page ({})",
            field.page,
            MAX_PAGES - 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::model::CompositePart;
    use crate::style::FieldStyle;

    const PAGE_H: f64 = 841.89;

    fn field(content: ContentKind, width_mm: f64, height_mm: f64, style: FieldStyle) -> FieldDescriptor {
        FieldDescriptor {
            name: "f".to_string(),
            x: 10.0,
            y: 20.0,
            width: width_mm,
            height: height_mm,
            page: 0,
            style,
            content,
        }
    }

    fn courier(alignment: Alignment) -> FieldStyle {
        FieldStyle {
            font_family: "Courier".to_string(),
            font_size: 10.0,
            alignment,
            ..FieldStyle::default()
        }
    }

    fn texts(cmds: &[DrawCommand]) -> Vec<(String, f64, f64)> {
        cmds.iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, x, y, .. } => Some((text.clone(), *x, *y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_mm_to_pt() {
        assert!((mm_to_pt(10.0) - 28.34645).abs() < 1e-9);
        let bx = BoxPt::from_field(&field(ContentKind::literal("x"), 50.0, 10.0, FieldStyle::default()));
        assert!((bx.pdf_y(PAGE_H) - (PAGE_H - 20.0 * MM_TO_PT - 10.0 * MM_TO_PT)).abs() < 1e-9);
    }

    #[test]
    fn test_single_line_anchor() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        // 5mm ≈ 14.2pt, not above 15pt: single-line.
        let f = field(ContentKind::literal("Hello world"), 80.0, 5.0, courier(Alignment::Left));
        let cmds = engine.layout(&f, &DataRecord::new()).unwrap();
        let t = texts(&cmds);
        assert_eq!(t.len(), 2);
        let x0 = 10.0 * MM_TO_PT;
        let top = 20.0 * MM_TO_PT;
        assert!((t[0].1 - x0).abs() < 1e-9);
        assert!((t[1].1 - (x0 + 36.0)).abs() < 1e-9);
        assert!((t[0].2 - (PAGE_H - top - 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_single_line_justify_is_left() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let j = field(ContentKind::literal("a b c"), 80.0, 5.0, courier(Alignment::Justify));
        let l = field(ContentKind::literal("a b c"), 80.0, 5.0, courier(Alignment::Left));
        let rec = DataRecord::new();
        assert_eq!(engine.layout(&j, &rec).unwrap(), engine.layout(&l, &rec).unwrap());
    }

    #[test]
    fn test_multi_line_vertical_centering() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        // width 60pt → "aaa bbb" (42pt) per line; two lines, 24pt block.
        let width_mm = 60.0 / MM_TO_PT;
        let height_mm = 100.0 / MM_TO_PT;
        let f = field(ContentKind::literal("aaa bbb ccc ddd"), width_mm, height_mm, courier(Alignment::Left));
        let bx = BoxPt::from_field(&f);
        let placed = engine.place_text("aaa bbb ccc ddd", &bx, &f.style.resolve());
        assert_eq!(placed.len(), 4);
        let block = 2.0 * 12.0;
        let top_offset = placed[0].y_offset - 10.0;
        assert!((top_offset - (100.0 - block) / 2.0).abs() < 1e-3);
        assert!((placed[2].y_offset - placed[0].y_offset - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_line_overflowing_block_top_aligned() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let bx = BoxPt {
            x: 0.0,
            top: 0.0,
            width: 20.0,
            height: 16.0,
        };
        let style = courier(Alignment::Left).resolve();
        let placed = engine.place_text("aaa bbb ccc", &bx, &style);
        // Three lines of 12pt do not fit in 16pt.
        assert!((placed[0].y_offset - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_line_justify_last_line_left() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let bx = BoxPt {
            x: 0.0,
            top: 0.0,
            width: 50.0,
            height: 100.0,
        };
        let style = courier(Alignment::Justify).resolve();
        let placed = engine.place_text("aaa bbb ccc dd", &bx, &style);
        // Line one is justified: "bbb" ends at 50.
        assert!((placed[1].x_offset + 18.0 - 50.0).abs() < 1e-3);
        // Last line keeps natural spacing.
        assert_eq!(placed[2].x_offset, 0.0);
        assert!((placed[3].x_offset - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_resolution_is_noop() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let f = field(ContentKind::bound("missing"), 50.0, 10.0, FieldStyle::default());
        assert!(engine.layout(&f, &DataRecord::new()).unwrap().is_empty());
    }

    #[test]
    fn test_composite_field_draws_words() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let f = field(
            ContentKind::Composite {
                parts: vec![
                    CompositePart::literal("Dear "),
                    CompositePart::bound("name"),
                    CompositePart::literal(","),
                ],
            },
            80.0,
            6.0,
            FieldStyle::default(),
        );
        let rec = DataRecord::from_pairs([("name", Some("Grace"))]);
        let words: Vec<String> = texts(&engine.layout(&f, &rec).unwrap())
            .into_iter()
            .map(|t| t.0)
            .collect();
        assert_eq!(words, vec!["Dear", "Grace,"]);
    }

    #[test]
    fn test_invalid_geometry() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let f = field(ContentKind::literal("x"), 0.0, 10.0, FieldStyle::default());
        let err = engine.layout(&f, &DataRecord::new()).unwrap_err();
        assert!(matches!(err, FieldError::InvalidGeometry { .. }));

        let mut style = FieldStyle::default();
        style.font_size = -1.0;
        let f = field(ContentKind::literal("x"), 10.0, 10.0, style);
        assert!(engine.layout(&f, &DataRecord::new()).is_err());
    }

    #[test]
    fn test_page_past_limit_rejected() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let mut f = field(ContentKind::literal("x"), 10.0, 10.0, FieldStyle::default());
        f.page = MAX_PAGES - 1;
        assert!(engine.layout(&f, &DataRecord::new()).is_ok());
        for page in [MAX_PAGES, usize::MAX] {
            f.page = page;
            let err = engine.layout_field(&f, &DataRecord::new()).unwrap_err();
            assert!(matches!(err, FieldError::InvalidGeometry { .. }));
        }
    }

    #[test]
    fn test_style_fallbacks_applied() {
        let ctx = FontContext::new();
        let engine = FieldLayoutEngine::new(&ctx, PAGE_H);
        let style = FieldStyle {
            font_family: "Wingdings".to_string(),
            bold: true,
            color: "#nothex".to_string(),
            ..FieldStyle::default()
        };
        let f = field(ContentKind::literal("Hi"), 50.0, 5.0, style);
        let cmds = engine.layout(&f, &DataRecord::new()).unwrap();
        match &cmds[0] {
            DrawCommand::Text { font, color, .. } => {
                assert_eq!(*font, StandardFont::HelveticaBold);
                assert_eq!(*color, Color::BLACK);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
