//! # Text Layout
//!
//! Greedy word wrapping. Text is split on whitespace into words, each
//! measured once; lines are packed left to right and a word that does not
//! fit starts the next line. There is no hyphenation and no mid-word
//! breaking: a word wider than the box sits alone on its own line and
//! overflows.

pub mod justify;

pub use justify::{layout_line, PlacedWord};

use crate::font::{StandardFont, TextMetrics};

/// A font at a size, bound to a metrics provider.
#[derive(Clone, Copy)]
pub struct Measurer<'a> {
    metrics: &'a dyn TextMetrics,
    font: StandardFont,
    size: f64,
}

impl<'a> Measurer<'a> {
    pub fn new(metrics: &'a dyn TextMetrics, font: StandardFont, size: f64) -> Self {
        Self {
            metrics,
            font,
            size,
        }
    }

    pub fn width(&self, text: &str) -> f64 {
        self.metrics.measure(text, self.font, self.size)
    }

    pub fn space_width(&self) -> f64 {
        self.width(" ")
    }
}

/// A word with its natural width.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub width: f64,
}

/// One line of words after breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub words: Vec<Word>,
    pub sum_word_widths: f64,
}

impl Line {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Width of the words set with natural spaces between them.
    pub fn natural_width(&self, space_width: f64) -> f64 {
        let gaps = self.words.len().saturating_sub(1) as f64;
        self.sum_word_widths + space_width * gaps
    }

    fn push(&mut self, word: Word) {
        self.sum_word_widths += word.width;
        self.words.push(word);
    }
}

/// Break `text` into lines no wider than `max_width`.
///
/// Blank text gives no lines.
pub fn break_lines(text: &str, max_width: f64, measure: &Measurer) -> Vec<Line> {
    let space_width = measure.space_width();
    let mut lines = Vec::new();
    let mut current = Line::default();
    let mut current_width = 0.0;

    for token in text.split_whitespace() {
        let word = Word {
            text: token.to_string(),
            width: measure.width(token),
        };

        if current.is_empty() {
            current_width = word.width;
            current.push(word);
            continue;
        }

        let candidate = current_width + space_width + word.width;
        if candidate <= max_width {
            current_width = candidate;
            current.push(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current_width = word.width;
            current.push(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    log::debug!(
        "broke {} chars into {} lines at max width {:.2}",
        text.len(),
        lines.len(),
        max_width
    );
    lines
}

/// All words of `text` on a single line, regardless of width.
pub fn single_line(text: &str, measure: &Measurer) -> Option<Line> {
    let mut line = Line::default();
    for token in text.split_whitespace() {
        line.push(Word {
            text: token.to_string(),
            width: measure.width(token),
        });
    }
    (!line.is_empty()).then_some(line)
}
