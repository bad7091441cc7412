//! Structured error types for the merge engine.
//!
//! Errors are layered by blast radius. A [`ResolveError`] or [`FieldError`]
//! costs one field, a [`RecordError`] costs one output document, and a
//! [`MergeError`] stops the caller (bad input files, unusable output
//! directory).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for top-level operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that abort the whole operation.
#[derive(Error, Debug)]
pub enum MergeError {
    /// JSON input (template, records or config) failed to parse.
    #[error("Failed to parse {what}: {source}{}", hint_suffix(.hint))]
    Parse {
        what: &'static str,
        source: serde_json::Error,
        hint: String,
    },

    /// Reading an input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The output directory could not be created. Nothing can be written,
    /// so the batch stops here.
    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir { path: PathBuf, source: io::Error },

    /// The worker pool could not be built.
    #[error("Cannot start worker pool: {0}")]
    Pool(String),

    /// A single document failed outside of a batch.
    #[error(transparent)]
    Render(#[from] RecordError),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl MergeError {
    /// Wrap a serde_json error with a hint based on its category.
    pub fn parse(what: &'static str, e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        MergeError::Parse {
            what,
            source: e,
            hint,
        }
    }
}

/// Failure to turn field content into a string.
///
/// A missing or null column is *not* an error; it resolves to "".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// Table content was asked for as text (e.g. a table nested in a cell).
    #[error("table content cannot be resolved to text")]
    NotText,

    /// A `number` transform met a value that is not numeric.
    #[error("column '{column}' value '{value}' is not a number")]
    NotANumber { column: String, value: String },
}

/// Failure to lay out one field. The document renderer skips the field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("field '{field}': invalid geometry ({reason})")]
    InvalidGeometry { field: String, reason: String },

    #[error("field '{field}': invalid table ({reason})")]
    InvalidTable { field: String, reason: String },

    #[error("field '{field}': {source}")]
    Resolve {
        field: String,
        #[source]
        source: ResolveError,
    },
}

impl FieldError {
    /// Name of the field that failed.
    pub fn field(&self) -> &str {
        match self {
            FieldError::InvalidGeometry { field, .. }
            | FieldError::InvalidTable { field, .. }
            | FieldError::Resolve { field, .. } => field,
        }
    }
}

/// Failure to produce one output document. Counted in the batch result.
#[derive(Error, Debug)]
pub enum RecordError {
    /// A field failed and the batch runs with the fail-record policy.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The document could not be written or moved into place.
    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The batch was cancelled before this record started.
    #[error("cancelled")]
    Cancelled,
}
