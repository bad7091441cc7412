//! # Letterpress
//!
//! A mail-merge engine: tabular records in, page-positioned PDF documents
//! out.
//!
//! A template is a list of fields, each a fixed box on a page with a style
//! and a content kind: literal text, a record column, a composite of both,
//! or a table. For every record the engine resolves each field's text,
//! wraps and aligns it inside its box, and draws the result. Placement is
//! exact and repeatable: the same template and record always give the same
//! word positions.
//!
//! ## Architecture
//!
//! ```text
//! Template + records (JSON)
//!       ↓
//!   [model]   : Fields, content kinds, records
//!       ↓
//!   [resolve] : Content kind + record → text
//!       ↓
//!   [text]    : Greedy word wrap, line alignment and justification
//!       ↓
//!   [layout]  : mm → pt, box placement, tables → draw commands
//!       ↓
//!   [pdf]     : Page surface, serialized to PDF bytes
//!       ↓
//!   [batch]   : One document per record on a worker pool
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod render;
pub mod resolve;
pub mod style;
pub mod text;

pub use batch::{render_batch, BatchResult, CancelToken, RecordFailure};
pub use config::{BatchConfig, FieldErrorPolicy};
pub use error::{FieldError, MergeError, RecordError, ResolveError};
pub use font::{FontContext, StandardFont, TextMetrics};
pub use layout::{DrawCommand, FieldLayoutEngine};
pub use model::{records_from_json, DataRecord, Template};
pub use pdf::{PageSurface, PdfSurface};
pub use render::{layout_fields, render_document, render_pdf};

/// Render one record against a template given as JSON.
///
/// Uses the built-in font metrics and skips fields that fail.
pub fn render_json(template_json: &str, record: &DataRecord) -> error::Result<Vec<u8>> {
    let template = Template::from_json(template_json)?;
    let font_context = FontContext::new();
    Ok(render_pdf(&template, record, &font_context, FieldErrorPolicy::Skip)?)
}
