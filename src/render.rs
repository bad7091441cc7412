//! Document rendering: every field of a template, for one record.
//!
//! Fields are laid out independently. A field that fails is either skipped
//! with a warning or fails the whole document, depending on the
//! [`FieldErrorPolicy`].

use serde::Serialize;

use crate::config::FieldErrorPolicy;
use crate::error::{FieldError, RecordError};
use crate::font::TextMetrics;
use crate::layout::{DrawCommand, FieldLayoutEngine};
use crate::model::{DataRecord, Template};
use crate::pdf::{replay, PageSurface, PdfSurface};

/// The layout of one field, or why it has none.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOutput {
    pub field: String,
    pub page: usize,
    pub commands: Vec<DrawCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened while rendering one document.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub pages: usize,
    /// Fields that produced at least one command.
    pub fields_drawn: usize,
    /// Fields left out under the skip policy.
    pub skipped: Vec<FieldError>,
}

/// Lay out every field of `template` for `record`, in template order.
pub fn layout_fields(
    template: &Template,
    record: &DataRecord,
    metrics: &dyn TextMetrics,
) -> Vec<FieldOutput> {
    let (_, page_height) = template.page.size.dimensions();
    let engine = FieldLayoutEngine::new(metrics, page_height);
    template
        .fields
        .iter()
        .map(|field| match engine.layout(field, record) {
            Ok(commands) => FieldOutput {
                field: field.name.clone(),
                page: field.page,
                commands,
                error: None,
            },
            Err(e) => FieldOutput {
                field: field.name.clone(),
                page: field.page,
                commands: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Draw every field of `template` for `record` onto `surface`.
///
/// The surface is expected to be on its first page; one page is started
/// for each further page the template uses.
pub fn render_document(
    template: &Template,
    record: &DataRecord,
    record_key: &str,
    metrics: &dyn TextMetrics,
    policy: FieldErrorPolicy,
    surface: &mut dyn PageSurface,
) -> Result<RenderReport, RecordError> {
    let (_, page_height) = template.page.size.dimensions();
    let engine = FieldLayoutEngine::new(metrics, page_height).with_record_key(record_key);
    let pages = template.page_count();
    let mut report = RenderReport {
        pages,
        ..RenderReport::default()
    };

    // Fields past the last page never reach a page loop; their layout
    // fails on the page check.
    for field in template.fields.iter().filter(|f| f.page >= pages) {
        if let Err(e) = engine.layout(field, record) {
            apply_policy(e, policy, record_key, &mut report)?;
        }
    }

    for page in 0..pages {
        if page > 0 {
            surface.new_page();
        }
        for field in template.fields.iter().filter(|f| f.page == page) {
            match engine.layout(field, record) {
                Ok(commands) => {
                    if !commands.is_empty() {
                        report.fields_drawn += 1;
                    }
                    replay(&commands, surface);
                }
                Err(e) => apply_policy(e, policy, record_key, &mut report)?,
            }
        }
    }

    Ok(report)
}

fn apply_policy(
    e: FieldError,
    policy: FieldErrorPolicy,
    record_key: &str,
    report: &mut RenderReport,
) -> Result<(), RecordError> {
    match policy {
        FieldErrorPolicy::Skip => {
            log::warn!("record {}: skipping {}", record_key, e);
            report.skipped.push(e);
            Ok(())
        }
        FieldErrorPolicy::FailRecord => Err(e.into()),
    }
}

/// Render `record` to PDF bytes.
pub fn render_pdf(
    template: &Template,
    record: &DataRecord,
    metrics: &dyn TextMetrics,
    policy: FieldErrorPolicy,
) -> Result<Vec<u8>, RecordError> {
    let (width, height) = template.page.size.dimensions();
    let mut surface = PdfSurface::new(width, height).with_metadata(template.metadata.clone());
    render_document(template, record, "", metrics, policy, &mut surface)?;
    Ok(surface.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;

    fn template() -> Template {
        Template::from_json(
            r#"{
                "fields": [
                    {"name": "greeting", "x": 20, "y": 20, "width": 100, "height": 8,
                     "content": {"type": "composite", "parts": [
                        {"type": "literal", "text": "Dear "},
                        {"type": "bound", "column": "name"}
                     ]}},
                    {"name": "total", "x": 20, "y": 40, "width": 50, "height": 8,
                     "content": {"type": "bound", "column": "total",
                                 "transform": {"kind": "number", "decimals": 2}}},
                    {"name": "broken", "x": 20, "y": 60, "width": 0, "height": 8,
                     "content": {"type": "literal", "text": "never drawn"}},
                    {"name": "back", "x": 20, "y": 20, "width": 100, "height": 8, "page": 1,
                     "content": {"type": "literal", "text": "Page two"}}
                ]
            }"#,
        )
        .unwrap()
    }

    fn record(total: &str) -> DataRecord {
        DataRecord::from_pairs([("name", Some("Ada")), ("total", Some(total))])
    }

    #[test]
    fn test_skip_policy_drops_bad_field() {
        let ctx = FontContext::new();
        let t = template();
        let mut surface = PdfSurface::new(595.28, 841.89);
        let report = render_document(&t, &record("12"), "1", &ctx, FieldErrorPolicy::Skip, &mut surface)
            .unwrap();
        assert_eq!(report.pages, 2);
        assert_eq!(report.fields_drawn, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].field(), "broken");
        assert_eq!(surface.page_count(), 2);
        assert!(surface.content(0).unwrap().contains("(12.00) Tj"));
        assert!(surface.content(1).unwrap().contains("(Page) Tj"));
    }

    #[test]
    fn test_fail_record_policy() {
        let ctx = FontContext::new();
        let t = template();
        let mut surface = PdfSurface::new(595.28, 841.89);
        let err = render_document(&t, &record("12"), "1", &ctx, FieldErrorPolicy::FailRecord, &mut surface)
            .unwrap_err();
        assert!(matches!(err, RecordError::Field(FieldError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_layout_fields_reports_errors_inline() {
        let ctx = FontContext::new();
        let outputs = layout_fields(&template(), &record("lots"), &ctx);
        assert_eq!(outputs.len(), 4);
        assert!(outputs[0].error.is_none());
        assert!(!outputs[0].commands.is_empty());
        assert!(outputs[1].error.as_deref().unwrap().contains("not a number"));
        assert!(outputs[2].error.is_some());
        assert_eq!(outputs[3].page, 1);

        let json = serde_json::to_value(&outputs[0]).unwrap();
        assert_eq!(json["commands"][0]["op"], "text");
        assert_eq!(json["commands"][0]["text"], "Dear");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_field_past_last_page_skipped() {
        let ctx = FontContext::new();
        let mut t = template();
        t.fields[3].page = usize::MAX;
        let mut surface = PdfSurface::new(595.28, 841.89);
        let report = render_document(&t, &record("12"), "1", &ctx, FieldErrorPolicy::Skip, &mut surface)
            .unwrap();
        assert_eq!(report.pages, 1);
        assert_eq!(report.fields_drawn, 2);
        let skipped: Vec<&str> = report.skipped.iter().map(|e| e.field()).collect();
        assert_eq!(skipped, vec!["back", "broken"]);
        assert_eq!(surface.page_count(), 1);
        assert!(surface.content(0).unwrap().contains("(12.00) Tj"));

        let mut surface = PdfSurface::new(595.28, 841.89);
        t.fields[2].width = 100.0;
        let err = render_document(&t, &record("12"), "1", &ctx, FieldErrorPolicy::FailRecord, &mut surface)
            .unwrap_err();
        assert!(matches!(err, RecordError::Field(FieldError::InvalidGeometry { ref field, .. }) if field == "back"));
    }

    #[test]
    fn test_render_pdf_bytes() {
        let ctx = FontContext::new();
        let bytes = render_pdf(&template(), &record("3.5"), &ctx, FieldErrorPolicy::Skip).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
    }
}
