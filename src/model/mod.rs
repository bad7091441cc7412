//! # Template Model
//!
//! The input representation for the merge engine. A template is a page
//! configuration plus a flat list of fields; each field is a box on a page
//! (millimetres, top-left origin) with a style and a content kind. Records
//! are ordered column → value maps, one per output document.
//!
//! Everything here is a plain immutable value. The layout engine borrows it
//! for one render call and keeps nothing.

use crate::error::{MergeError, Result};
use crate::style::{Alignment, FieldStyle};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Most pages one output document may have. Fields placed beyond the last
/// page fail on their own and do not add pages.
pub const MAX_PAGES: usize = 1000;

/// A complete merge template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Page size shared by every page of the output document.
    #[serde(default)]
    pub page: PageConfig,

    /// Document metadata (title, author, etc.)
    #[serde(default)]
    pub metadata: Metadata,

    /// Fields in drawing order.
    pub fields: Vec<FieldDescriptor>,
}

impl Template {
    /// Parse a template from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MergeError::parse("template", e))
    }

    /// Number of pages the output document needs. Fields on a page at or
    /// past [`MAX_PAGES`] are not counted.
    pub fn page_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.page < MAX_PAGES)
            .filter_map(|f| f.page.checked_add(1))
            .max()
            .unwrap_or(1)
    }
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// Configuration for a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default)]
    pub size: PageSize,
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// One placement unit on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,

    /// Left edge in millimetres from the page's left edge.
    pub x: f64,
    /// Top edge in millimetres from the page's top edge.
    pub y: f64,
    /// Box width in millimetres. Must be positive.
    pub width: f64,
    /// Box height in millimetres. Must be positive.
    pub height: f64,

    /// Zero-based page index.
    #[serde(default)]
    pub page: usize,

    #[serde(default)]
    pub style: FieldStyle,

    pub content: ContentKind,
}

/// What a field (or table cell) shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentKind {
    /// Fixed text.
    #[serde(alias = "texto")]
    Literal {
        #[serde(default)]
        text: String,
    },
    /// The value of one record column.
    #[serde(alias = "campo")]
    Bound {
        column: String,
        #[serde(default)]
        transform: Option<ValueTransform>,
    },
    /// Literal and bound parts concatenated in order, no separator.
    #[serde(alias = "compuesto")]
    Composite { parts: Vec<CompositePart> },
    /// A grid of cells.
    #[serde(alias = "tabla")]
    Table(TableSpec),
}

impl ContentKind {
    pub fn literal(text: impl Into<String>) -> Self {
        ContentKind::Literal { text: text.into() }
    }

    pub fn bound(column: impl Into<String>) -> Self {
        ContentKind::Bound {
            column: column.into(),
            transform: None,
        }
    }
}

/// One piece of a composite field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositePart {
    #[serde(flatten)]
    pub source: PartSource,

    /// Hidden parts contribute nothing.
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl CompositePart {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            source: PartSource::Literal { text: text.into() },
            visible: true,
        }
    }

    pub fn bound(column: impl Into<String>) -> Self {
        Self {
            source: PartSource::Bound {
                column: column.into(),
                transform: None,
            },
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Where a composite part's text comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PartSource {
    #[serde(alias = "texto")]
    Literal {
        #[serde(default)]
        text: String,
    },
    #[serde(alias = "campo")]
    Bound {
        column: String,
        #[serde(default)]
        transform: Option<ValueTransform>,
    },
}

/// Optional rewrite applied to a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValueTransform {
    Upper,
    Lower,
    Trim,
    /// Fixed-point number with `decimals` digits after the point.
    Number {
        #[serde(default)]
        decimals: usize,
    },
}

fn default_true() -> bool {
    true
}

/// Grid definition of a table field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub columns: usize,
    pub rows: usize,

    /// Row 0 is a header row: bold, centered, filled.
    #[serde(default, alias = "headerEnabled")]
    pub header: bool,

    /// Stroke every cell.
    #[serde(default = "default_true", alias = "borderEnabled")]
    pub border: bool,

    /// Explicit column widths in millimetres. Ignored unless there is one
    /// positive entry per column.
    #[serde(default)]
    pub column_widths: Option<Vec<f64>>,

    /// Explicit row heights in millimetres. Ignored unless there is one
    /// positive entry per row.
    #[serde(default)]
    pub row_heights: Option<Vec<f64>>,

    /// Per-cell overrides, `cells[row][col]`. Missing entries are empty cells.
    #[serde(default)]
    pub cells: Vec<Vec<Option<CellSpec>>>,
}

impl TableSpec {
    /// Override for a cell, if the author supplied one.
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellSpec> {
        self.cells.get(row)?.get(col)?.as_ref()
    }
}

/// Override for one table cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellSpec {
    pub content: ContentKind,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub bold: Option<bool>,
}

impl Default for CellSpec {
    fn default() -> Self {
        Self {
            content: ContentKind::literal(""),
            alignment: None,
            bold: None,
        }
    }
}

/// One row of merge data: ordered column → value, `None` for null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "IndexMap<String, serde_json::Value>")]
pub struct DataRecord {
    columns: IndexMap<String, Option<String>>,
}

impl DataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, Option<V>)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        }
    }

    /// Value of a column. `None` when the column is missing or null.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column)?.as_deref()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<IndexMap<String, serde_json::Value>> for DataRecord {
    fn from(raw: IndexMap<String, serde_json::Value>) -> Self {
        let columns = raw
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Bool(b) => Some(b.to_string()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    other => Some(other.to_string()),
                };
                (k, value)
            })
            .collect();
        Self { columns }
    }
}

/// Parse a JSON array of records.
pub fn records_from_json(json: &str) -> Result<Vec<DataRecord>> {
    serde_json::from_str(json).map_err(|e| MergeError::parse("records", e))
}
