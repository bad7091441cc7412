//! Batch configuration.
//!
//! Loaded from a JSON file (all keys optional) and then overridden by
//! command-line flags in the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// What to do when a single field cannot be laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldErrorPolicy {
    /// Log a warning, leave the field out, keep rendering the document.
    #[default]
    Skip,
    /// Any field error fails the whole record.
    FailRecord,
}

impl std::str::FromStr for FieldErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skip" => Ok(FieldErrorPolicy::Skip),
            "fail-record" => Ok(FieldErrorPolicy::FailRecord),
            other => Err(format!(
                "unknown field error policy '{}' (expected 'skip' or 'fail-record')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfig {
    /// Directory that receives one PDF per record. Created if missing.
    pub output_dir: PathBuf,

    /// Worker threads. 0 lets rayon pick (one per core).
    pub workers: usize,

    pub field_errors: FieldErrorPolicy,

    /// Column whose value names each output file. Falls back to the
    /// 1-based record number when unset, missing or blank.
    pub key_column: Option<String>,

    /// Prepended to every output file name.
    pub prefix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            workers: 0,
            field_errors: FieldErrorPolicy::Skip,
            key_column: None,
            prefix: String::new(),
        }
    }
}

impl BatchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MergeError::parse("config", e))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
