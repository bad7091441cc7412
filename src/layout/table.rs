//! # Table Layout
//!
//! Divides a table field's box into a grid and lays out every cell.
//!
//! Column widths and row heights are uniform unless the table supplies an
//! explicit list with exactly one positive entry per column (row). A list
//! of the wrong length or with a non-positive entry is ignored with a
//! warning and the grid falls back to uniform tracks.
//!
//! Each cell is a small single-line field: its text is placed with the
//! same engine as ordinary fields, inset horizontally by [`CELL_PADDING`]
//! and clipped to the cell. A cell whose content cannot be resolved is
//! drawn empty with a pale red fill so the problem is visible in the
//! output. It does not fail the table.

use super::{mm_to_pt, BoxPt, DrawCommand, FieldLayoutEngine};
use crate::error::FieldError;
use crate::model::{CellSpec, DataRecord, FieldDescriptor, TableSpec};
use crate::resolve::resolve;
use crate::style::{resolve_font, Alignment, Color, ResolvedStyle};

/// Most rows, and most columns, a table may have.
pub const MAX_TRACKS: usize = 500;

/// Most cells a table may have.
pub const MAX_CELLS: usize = 10_000;

/// Horizontal inset of cell text, in points.
pub const CELL_PADDING: f64 = 2.0;

pub const HEADER_FILL: Color = Color {
    r: 0.9,
    g: 0.9,
    b: 0.9,
};

/// Fill for cells whose content failed to resolve.
pub const FLAGGED_FILL: Color = Color {
    r: 1.0,
    g: 0.85,
    b: 0.85,
};

/// One cell of the grid in points (top measured from the page top).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBox {
    pub row: usize,
    pub col: usize,
    pub bounds: BoxPt,
}

/// Split `field_box` into `spec.rows × spec.columns` cells, row-major.
/// The caller has checked the dimensions against [`MAX_TRACKS`] and
/// [`MAX_CELLS`].
fn grid(field: &FieldDescriptor, spec: &TableSpec, field_box: &BoxPt) -> Vec<CellBox> {
    let widths = tracks(
        field_box.width,
        spec.columns,
        spec.column_widths.as_deref(),
        &field.name,
        "column widths",
    );
    let heights = tracks(
        field_box.height,
        spec.rows,
        spec.row_heights.as_deref(),
        &field.name,
        "row heights",
    );

    let mut cells = Vec::with_capacity(spec.rows * spec.columns);
    let mut top = field_box.top;
    for (row, h) in heights.iter().enumerate() {
        let mut x = field_box.x;
        for (col, w) in widths.iter().enumerate() {
            cells.push(CellBox {
                row,
                col,
                bounds: BoxPt {
                    x,
                    top,
                    width: *w,
                    height: *h,
                },
            });
            x += w;
        }
        top += h;
    }
    cells
}

fn tracks(total: f64, count: usize, explicit_mm: Option<&[f64]>, field: &str, what: &str) -> Vec<f64> {
    if let Some(list) = explicit_mm {
        if list.len() == count && list.iter().all(|v| *v > 0.0 && v.is_finite()) {
            return list.iter().map(|v| mm_to_pt(*v)).collect();
        }
        log::warn!(
            "table '{}': ignoring {} ({} entries for {} tracks, all must be positive)",
            field,
            what,
            list.len(),
            count
        );
    }
    vec![total / count as f64; count]
}

/// Lay out a table field.
pub fn layout_table(
    engine: &FieldLayoutEngine,
    field: &FieldDescriptor,
    spec: &TableSpec,
    record: &DataRecord,
) -> Result<Vec<DrawCommand>, FieldError> {
    let cells = spec.columns.checked_mul(spec.rows);
    let too_big = spec.columns > MAX_TRACKS
        || spec.rows > MAX_TRACKS
        || cells.map_or(true, |n| n > MAX_CELLS);
    if spec.columns == 0 || spec.rows == 0 || too_big {
        return Err(FieldError::InvalidTable {
            field: field.name.clone(),
            reason: format!(
                "{} columns × {} rows (at most {} each, {} cells)",
                spec.columns, spec.rows, MAX_TRACKS, MAX_CELLS
            ),
        });
    }

    let field_box = BoxPt::from_field(field);
    let page_height = engine.page_height();
    let empty = CellSpec::default();
    let mut commands = Vec::new();
    let mut borders = Vec::new();

    for cell in grid(field, spec, &field_box) {
        let b = cell.bounds;
        let rect_y = b.pdf_y(page_height);
        let is_header = spec.header && cell.row == 0;
        let cell_spec = spec.cell(cell.row, cell.col).unwrap_or(&empty);

        if is_header {
            commands.push(DrawCommand::Rect {
                x: b.x,
                y: rect_y,
                width: b.width,
                height: b.height,
                stroke: None,
                fill: Some(HEADER_FILL),
            });
        }

        match resolve(&cell_spec.content, record) {
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                let style = cell_style(field, cell_spec, is_header);
                let inner = BoxPt {
                    x: b.x + CELL_PADDING,
                    width: (b.width - 2.0 * CELL_PADDING).max(0.0),
                    ..b
                };
                let placed = engine.place_single_line(
                    &text,
                    inner.width,
                    style.font,
                    style.font_size,
                    style.alignment,
                );
                commands.push(DrawCommand::Clip {
                    x: b.x,
                    y: rect_y,
                    width: b.width,
                    height: b.height,
                    children: engine.to_commands(&placed, &inner, &style),
                });
            }
            Err(e) => {
                log::warn!(
                    "record {}: table '{}' cell ({}, {}) left empty: {}",
                    engine.record_key(),
                    field.name,
                    cell.row,
                    cell.col,
                    e
                );
                commands.push(DrawCommand::Rect {
                    x: b.x,
                    y: rect_y,
                    width: b.width,
                    height: b.height,
                    stroke: None,
                    fill: Some(FLAGGED_FILL),
                });
            }
        }

        if spec.border {
            borders.push(DrawCommand::Rect {
                x: b.x,
                y: rect_y,
                width: b.width,
                height: b.height,
                stroke: Some(Color::BLACK),
                fill: None,
            });
        }
    }

    // Borders last so fills never cover a neighbour's edge.
    commands.extend(borders);
    Ok(commands)
}

fn cell_style(field: &FieldDescriptor, cell: &CellSpec, is_header: bool) -> ResolvedStyle {
    let base = field.style.resolve();
    let (bold, alignment) = if is_header {
        (true, Alignment::Center)
    } else {
        (
            cell.bold.unwrap_or(field.style.bold),
            cell.alignment.unwrap_or(Alignment::Left),
        )
    };
    ResolvedStyle {
        font: resolve_font(&field.style.font_family, bold, field.style.italic),
        alignment,
        ..base
    }
}
