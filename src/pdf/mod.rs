//! # PDF Surface
//!
//! The drawing target for laid-out fields. [`PageSurface`] is the narrow
//! interface the renderer draws through; [`PdfSurface`] implements it by
//! writing PDF 1.7 directly.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, content streams, pages
//! ...
//! xref                <- byte offset of every object
//! trailer             <- points to the catalog and the info dictionary
//! %%EOF
//! ```
//!
//! Only the fourteen standard fonts are used, so a font is a single Type1
//! dictionary with WinAnsiEncoding and nothing is embedded. Text outside
//! WinAnsi is written as `?`. Content streams are zlib-compressed.

use std::fmt::Write as FmtWrite;
use std::io::{self, Write as IoWrite};
use std::path::Path;

use chrono::{DateTime, Local};
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::font::StandardFont;
use crate::layout::DrawCommand;
use crate::model::Metadata;
use crate::style::Color;

/// Stroke width of rectangle outlines, in points.
pub const BORDER_WIDTH: f64 = 0.5;

/// A page-oriented drawing target. Coordinates are PDF user space:
/// points, origin at the bottom-left corner of the page.
pub trait PageSurface {
    /// Draw `text` with its baseline starting at `(x, y)`.
    fn draw_text(&mut self, x: f64, y: f64, text: &str, font: StandardFont, size: f64, color: Color);

    /// Draw a rectangle. With neither stroke nor fill this is a no-op.
    fn draw_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        stroke: Option<Color>,
        fill: Option<Color>,
    );

    /// Restrict drawing to a rectangle until the matching [`pop_clip`].
    ///
    /// [`pop_clip`]: PageSurface::pop_clip
    fn push_clip(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn pop_clip(&mut self);

    /// Start a new page; later drawing goes there.
    fn new_page(&mut self);

    /// Serialize the document.
    fn finish(&mut self) -> Vec<u8>;

    /// Serialize the document and write it to `path`.
    ///
    /// The bytes go to a temporary file next to `path` that is renamed into
    /// place, so `path` either holds a complete document or is untouched.
    fn save(&mut self, path: &Path) -> io::Result<()> {
        let bytes = self.finish();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Feed draw commands into a surface, in order.
pub fn replay(commands: &[DrawCommand], surface: &mut dyn PageSurface) {
    for command in commands {
        match command {
            DrawCommand::Text {
                text,
                x,
                y,
                font,
                size,
                color,
            } => surface.draw_text(*x, *y, text, *font, *size, *color),
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                stroke,
                fill,
            } => surface.draw_rect(*x, *y, *width, *height, *stroke, *fill),
            DrawCommand::Clip {
                x,
                y,
                width,
                height,
                children,
            } => {
                surface.push_clip(*x, *y, *width, *height);
                replay(children, surface);
                surface.pop_clip();
            }
        }
    }
}

/// A [`PageSurface`] that produces a PDF document.
pub struct PdfSurface {
    width: f64,
    height: f64,
    metadata: Metadata,
    created: DateTime<Local>,
    /// Content streams of finished pages.
    pages: Vec<String>,
    /// Content stream of the page being drawn.
    current: String,
    clip_depth: usize,
    /// Fonts in order of first use; index i is resource `/F{i}`.
    fonts: Vec<StandardFont>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfSurface {
    /// A document with one empty page of `width × height` points.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            metadata: Metadata::default(),
            created: Local::now(),
            pages: Vec::new(),
            current: String::new(),
            clip_depth: 0,
            fonts: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_creation_date(mut self, created: DateTime<Local>) -> Self {
        self.created = created;
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + 1
    }

    /// Uncompressed content stream of page `index`.
    pub fn content(&self, index: usize) -> Option<&str> {
        if index == self.pages.len() {
            Some(&self.current)
        } else {
            self.pages.get(index).map(String::as_str)
        }
    }

    fn font_index(&mut self, font: StandardFont) -> usize {
        match self.fonts.iter().position(|f| *f == font) {
            Some(i) => i,
            None => {
                self.fonts.push(font);
                self.fonts.len() - 1
            }
        }
    }

    fn close_clips(&mut self) {
        for _ in 0..self.clip_depth {
            self.current.push_str("Q\n");
        }
        self.clip_depth = 0;
    }

    fn build_font_resource_dict(&self) -> String {
        self.fonts
            .iter()
            .enumerate()
            .map(|(i, _)| format!("/F{} {} 0 R", i, 3 + i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn info_dict(&self) -> String {
        let mut info = String::from("<< ");
        if let Some(ref title) = self.metadata.title {
            let _ = write!(info, "/Title ({}) ", encode_pdf_text(title));
        }
        if let Some(ref author) = self.metadata.author {
            let _ = write!(info, "/Author ({}) ", encode_pdf_text(author));
        }
        if let Some(ref subject) = self.metadata.subject {
            let _ = write!(info, "/Subject ({}) ", encode_pdf_text(subject));
        }
        let _ = write!(
            info,
            "/CreationDate ({}) /Producer (letterpress {}) >>",
            pdf_date(&self.created),
            env!("CARGO_PKG_VERSION")
        );
        info
    }

    fn build(&self) -> Vec<u8> {
        let all_pages: Vec<&str> = self
            .pages
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.current.as_str()))
            .collect();

        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog, 2 = Pages, 3.. = fonts, then content/page pairs
        let mut objects: Vec<PdfObject> = Vec::new();
        objects.push(PdfObject { data: vec![] });
        objects.push(PdfObject {
            data: b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        });
        objects.push(PdfObject { data: vec![] });

        for font in &self.fonts {
            objects.push(PdfObject {
                data: format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.pdf_name()
                )
                .into_bytes(),
            });
        }

        let resources = if self.fonts.is_empty() {
            String::new()
        } else {
            format!("/Font << {} >>", self.build_font_resource_dict())
        };

        let mut page_obj_ids = Vec::with_capacity(all_pages.len());
        for content in all_pages {
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = objects.len();
            let mut data: Vec<u8> = Vec::new();
            let _ = write!(
                data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            data.extend_from_slice(&compressed);
            data.extend_from_slice(b"\nendstream");
            objects.push(PdfObject { data });

            let page_obj_id = objects.len();
            objects.push(PdfObject {
                data: format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Contents {} 0 R /Resources << {} >> >>",
                    self.width, self.height, content_obj_id, resources
                )
                .into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        let kids = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = objects.len();
        objects.push(PdfObject {
            data: self.info_dict().into_bytes(),
        });

        serialize(&objects, info_obj_id)
    }
}

impl PageSurface for PdfSurface {
    fn draw_text(&mut self, x: f64, y: f64, text: &str, font: StandardFont, size: f64, color: Color) {
        if text.is_empty() {
            return;
        }
        let idx = self.font_index(font);
        let _ = write!(
            self.current,
            "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
            color.r,
            color.g,
            color.b,
            idx,
            size,
            x,
            y,
            encode_pdf_text(text)
        );
    }

    fn draw_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        stroke: Option<Color>,
        fill: Option<Color>,
    ) {
        if let Some(bg) = fill {
            let _ = write!(
                self.current,
                "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                bg.r, bg.g, bg.b, x, y, width, height
            );
        }
        if let Some(bc) = stroke {
            let _ = write!(
                self.current,
                "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                bc.r, bc.g, bc.b, BORDER_WIDTH, x, y, width, height
            );
        }
    }

    fn push_clip(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let _ = write!(
            self.current,
            "q\n{:.2} {:.2} {:.2} {:.2} re\nW n\n",
            x, y, width, height
        );
        self.clip_depth += 1;
    }

    fn pop_clip(&mut self) {
        if self.clip_depth > 0 {
            self.current.push_str("Q\n");
            self.clip_depth -= 1;
        } else {
            log::warn!("pop_clip without a matching push_clip");
        }
    }

    fn new_page(&mut self) {
        self.close_clips();
        self.pages.push(std::mem::take(&mut self.current));
    }

    fn finish(&mut self) -> Vec<u8> {
        self.close_clips();
        self.build()
    }
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(objects: &[PdfObject], info_obj_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }

    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len(),
        info_obj_id,
        xref_offset
    );
    output
}

/// `D:YYYYMMDDHHmmSS+hh'mm'`
fn pdf_date(date: &DateTime<Local>) -> String {
    let offset = date.format("%:z").to_string().replace(':', "'");
    format!("D:{}{}'", date.format("%Y%m%d%H%M%S"), offset)
}

/// Encode text as the body of a PDF literal string in WinAnsiEncoding.
fn encode_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// Codepoints in 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F
/// range holds the Windows-1252 extras (smart quotes, dashes, euro).
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> PdfSurface {
        PdfSurface::new(595.28, 841.89)
    }

    fn contains(bytes: &[u8], needle: &str) -> bool {
        bytes.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    #[test]
    fn test_encode_pdf_text() {
        assert_eq!(encode_pdf_text("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(encode_pdf_text("back\\slash"), "back\\\\slash");
        assert_eq!(encode_pdf_text("café"), "caf\\351");
        assert_eq!(encode_pdf_text("€5"), "\\2005");
        assert_eq!(encode_pdf_text("日本"), "??");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let bytes = a4().finish();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(contains(&bytes, "%%EOF"));
        assert!(contains(&bytes, "xref"));
        assert!(contains(&bytes, "trailer"));
        assert!(contains(&bytes, "/Count 1"));
        assert!(contains(&bytes, "/MediaBox [0 0 595.28 841.89]"));
    }

    #[test]
    fn test_metadata_in_info_dict() {
        let mut surface = a4().with_metadata(Metadata {
            title: Some("Invoice (March)".to_string()),
            author: Some("Accounts".to_string()),
            subject: None,
        });
        let bytes = surface.finish();
        assert!(contains(&bytes, "/Title (Invoice \\(March\\))"));
        assert!(contains(&bytes, "/Author (Accounts)"));
        assert!(!contains(&bytes, "/Subject"));
        assert!(contains(&bytes, "/CreationDate (D:"));
        assert!(contains(&bytes, "/Info "));
    }

    #[test]
    fn test_fonts_registered_once_each() {
        let mut surface = a4();
        surface.draw_text(10.0, 10.0, "A", StandardFont::Helvetica, 12.0, Color::BLACK);
        surface.draw_text(10.0, 30.0, "B", StandardFont::HelveticaBold, 12.0, Color::BLACK);
        surface.draw_text(10.0, 50.0, "C", StandardFont::Helvetica, 10.0, Color::BLACK);
        let content = surface.content(0).unwrap().to_string();
        assert!(content.contains("/F0 12.0 Tf"));
        assert!(content.contains("/F1 12.0 Tf"));
        assert!(content.contains("/F0 10.0 Tf"));

        let bytes = surface.finish();
        assert!(contains(&bytes, "/BaseFont /Helvetica "));
        assert!(contains(&bytes, "/BaseFont /Helvetica-Bold "));
        assert_eq!(
            String::from_utf8_lossy(&bytes).matches("/Subtype /Type1").count(),
            2
        );
    }

    #[test]
    fn test_rect_stroke_and_fill() {
        let mut surface = a4();
        surface.draw_rect(1.0, 2.0, 3.0, 4.0, Some(Color::BLACK), Some(Color::WHITE));
        surface.draw_rect(1.0, 2.0, 3.0, 4.0, None, None);
        let content = surface.content(0).unwrap();
        assert!(content.contains("1.000 1.000 1.000 rg\n1.00 2.00 3.00 4.00 re\nf"));
        assert!(content.contains("0.000 0.000 0.000 RG\n0.50 w\n1.00 2.00 3.00 4.00 re\nS"));
        assert_eq!(content.matches(" re\n").count(), 2);
    }

    #[test]
    fn test_clips_balanced_across_pages() {
        let mut surface = a4();
        surface.push_clip(0.0, 0.0, 50.0, 50.0);
        surface.push_clip(0.0, 0.0, 20.0, 20.0);
        surface.pop_clip();
        surface.new_page();
        surface.pop_clip();
        surface.push_clip(0.0, 0.0, 10.0, 10.0);
        surface.finish();

        for page in 0..2 {
            let content = surface.content(page).unwrap();
            assert_eq!(
                content.matches("q\n").count(),
                content.matches("Q\n").count(),
                "unbalanced page {page}"
            );
        }
        assert!(surface.content(0).unwrap().contains("W n"));
    }

    #[test]
    fn test_multiple_pages() {
        let mut surface = a4();
        surface.new_page();
        surface.new_page();
        assert_eq!(surface.page_count(), 3);
        let bytes = surface.finish();
        assert!(contains(&bytes, "/Count 3"));
        assert_eq!(
            String::from_utf8_lossy(&bytes).matches("/Type /Page ").count(),
            3
        );
    }

    #[test]
    fn test_replay_commands() {
        let commands = vec![
            DrawCommand::Rect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                stroke: Some(Color::BLACK),
                fill: None,
            },
            DrawCommand::Clip {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                children: vec![DrawCommand::Text {
                    text: "inside".to_string(),
                    x: 1.0,
                    y: 2.0,
                    font: StandardFont::TimesRoman,
                    size: 9.0,
                    color: Color::BLACK,
                }],
            },
        ];
        let mut surface = a4();
        replay(&commands, &mut surface);
        let content = surface.content(0).unwrap();
        let clip_at = content.find("W n").unwrap();
        let text_at = content.find("(inside) Tj").unwrap();
        assert!(clip_at < text_at);
        assert!(content.ends_with("ET\nQ\n"));
    }

    #[test]
    fn test_save_writes_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let mut surface = a4();
        surface.draw_text(72.0, 720.0, "Saved", StandardFont::Courier, 11.0, Color::BLACK);
        surface.save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        // Only the final file remains in the directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_pdf_date_format() {
        let date = pdf_date(&Local::now());
        assert!(date.starts_with("D:"));
        assert!(date.ends_with('\''));
        assert_eq!(date.len(), "D:20240101120000+01'00'".len());
    }
}
