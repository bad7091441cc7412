//! Horizontal placement of the words of one line.

use super::Line;
use crate::style::Alignment;

/// A word positioned relative to its field box.
///
/// `x_offset` runs right from the box's left edge; `y_offset` is the
/// baseline distance below the box's top edge. Both in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub x_offset: f64,
    pub y_offset: f64,
}

/// Place the words of `line` within `target_width`.
///
/// Justified lines spread `target_width - sum_word_widths` evenly over the
/// gaps, so the last word ends exactly at `target_width`. A single word or
/// the last line of a block is never stretched and is set flush left.
/// Lines wider than the target are not clipped: center and right alignment
/// then start at a negative offset.
pub fn layout_line(
    line: &Line,
    target_width: f64,
    alignment: Alignment,
    space_width: f64,
    is_last_line: bool,
) -> Vec<PlacedWord> {
    let n = line.word_count();
    let natural = line.natural_width(space_width);

    let (start, gap) = match alignment {
        Alignment::Left => (0.0, space_width),
        Alignment::Center => ((target_width - natural) / 2.0, space_width),
        Alignment::Right => (target_width - natural, space_width),
        Alignment::Justify if n <= 1 || is_last_line => (0.0, space_width),
        Alignment::Justify => {
            let extra_per_gap = (target_width - natural) / (n - 1) as f64;
            (0.0, space_width + extra_per_gap)
        }
    };

    let mut x = start;
    line.words
        .iter()
        .map(|w| {
            let placed = PlacedWord {
                word: w.text.clone(),
                x_offset: x,
                y_offset: 0.0,
            };
            x += w.width + gap;
            placed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Word;

    fn line(words: &[(&str, f64)]) -> Line {
        Line {
            words: words
                .iter()
                .map(|(t, w)| Word {
                    text: t.to_string(),
                    width: *w,
                })
                .collect(),
            sum_word_widths: words.iter().map(|(_, w)| w).sum(),
        }
    }

    fn fox() -> Line {
        line(&[("The", 20.0), ("quick", 25.0), ("brown", 30.0), ("fox", 15.0)])
    }

    fn offsets(placed: &[PlacedWord]) -> Vec<f64> {
        placed.iter().map(|p| p.x_offset).collect()
    }

    #[test]
    fn test_left() {
        let placed = layout_line(&fox(), 100.0, Alignment::Left, 5.0, false);
        assert_eq!(offsets(&placed), vec![0.0, 25.0, 55.0, 90.0]);
    }

    #[test]
    fn test_center_and_right() {
        let l = line(&[("ab", 10.0), ("cd", 20.0)]);
        // natural = 10 + 5 + 20 = 35
        let c = layout_line(&l, 100.0, Alignment::Center, 5.0, false);
        assert_eq!(offsets(&c), vec![32.5, 47.5]);
        let r = layout_line(&l, 100.0, Alignment::Right, 5.0, false);
        assert_eq!(offsets(&r), vec![65.0, 80.0]);
    }

    #[test]
    fn test_justify_worked_example() {
        // sum = 90, three gaps share the remaining 10pt.
        let placed = layout_line(&fox(), 100.0, Alignment::Justify, 5.0, false);
        assert!((placed[1].x_offset - (20.0 + 10.0 / 3.0)).abs() < 1e-9);
        assert!((placed[1].x_offset - 23.333).abs() < 1e-3);
        let last = placed.last().unwrap();
        assert!((last.x_offset + 15.0 - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_justify_fills_target() {
        let l = line(&[("a", 7.5), ("bb", 13.25), ("ccc", 21.0), ("d", 4.0), ("ee", 9.9)]);
        for target in [60.0, 88.8, 150.0] {
            let placed = layout_line(&l, target, Alignment::Justify, 2.78, false);
            let last = placed.last().unwrap();
            assert!((last.x_offset + 9.9 - target).abs() < 1e-3);
        }
    }

    #[test]
    fn test_justify_falls_back_to_left() {
        let single = line(&[("Alone", 40.0)]);
        assert_eq!(
            layout_line(&single, 100.0, Alignment::Justify, 5.0, false),
            layout_line(&single, 100.0, Alignment::Left, 5.0, false)
        );
        assert_eq!(
            layout_line(&fox(), 100.0, Alignment::Justify, 5.0, true),
            layout_line(&fox(), 100.0, Alignment::Left, 5.0, true)
        );
    }

    #[test]
    fn test_overflow_is_not_clipped() {
        let wide = line(&[("Supercalifragilistic", 120.0)]);
        let r = layout_line(&wide, 100.0, Alignment::Right, 5.0, false);
        assert_eq!(r[0].x_offset, -20.0);
        let c = layout_line(&wide, 100.0, Alignment::Center, 5.0, false);
        assert_eq!(c[0].x_offset, -10.0);
    }

    #[test]
    fn test_empty_line() {
        let empty = Line::default();
        assert!(layout_line(&empty, 100.0, Alignment::Justify, 5.0, false).is_empty());
    }
}
