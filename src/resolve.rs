//! Content resolution: turn a field's content kind into display text.
//!
//! Missing and null columns resolve to the empty string so that partial
//! records still render. The only failures are asking a table for text and
//! a `number` transform on a value that is not a number.

use crate::error::ResolveError;
use crate::model::{CompositePart, ContentKind, DataRecord, PartSource, ValueTransform};

/// Most digits a `number` transform writes after the point.
pub const MAX_DECIMALS: usize = 20;

/// Resolve a content kind against a record.
pub fn resolve(content: &ContentKind, record: &DataRecord) -> Result<String, ResolveError> {
    match content {
        ContentKind::Literal { text } => Ok(text.clone()),
        ContentKind::Bound { column, transform } => resolve_bound(column, *transform, record),
        ContentKind::Composite { parts } => resolve_composite(parts, record),
        ContentKind::Table(_) => Err(ResolveError::NotText),
    }
}

fn resolve_composite(parts: &[CompositePart], record: &DataRecord) -> Result<String, ResolveError> {
    let mut out = String::new();
    for part in parts.iter().filter(|p| p.visible) {
        match &part.source {
            PartSource::Literal { text } => out.push_str(text),
            PartSource::Bound { column, transform } => {
                out.push_str(&resolve_bound(column, *transform, record)?)
            }
        }
    }
    Ok(out)
}

fn resolve_bound(
    column: &str,
    transform: Option<ValueTransform>,
    record: &DataRecord,
) -> Result<String, ResolveError> {
    let value = record.get(column).unwrap_or("");
    match transform {
        None => Ok(value.to_string()),
        Some(t) => apply_transform(t, column, value),
    }
}

fn apply_transform(
    transform: ValueTransform,
    column: &str,
    value: &str,
) -> Result<String, ResolveError> {
    match transform {
        ValueTransform::Upper => Ok(value.to_uppercase()),
        ValueTransform::Lower => Ok(value.to_lowercase()),
        ValueTransform::Trim => Ok(value.trim().to_string()),
        ValueTransform::Number { decimals } => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            let n: f64 = trimmed.parse().map_err(|_| ResolveError::NotANumber {
                column: column.to_string(),
                value: value.to_string(),
            })?;
            Ok(format!("{:.prec$}", n, prec = decimals.min(MAX_DECIMALS)))
        }
    }
}
