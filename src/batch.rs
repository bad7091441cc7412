//! # Batch Orchestrator
//!
//! One PDF per record, rendered on a bounded worker pool.
//!
//! ```text
//! create output dir ──(fails)──► MergeError::OutputDir
//!       ↓
//! name every record up front (unique, timestamped)
//!       ↓
//! rayon pool: per record
//!   cancelled? ──► RecordFailure "cancelled"
//!   render_document → PdfSurface → temp file → rename
//!   error ──► RecordFailure, batch continues
//!       ↓
//! BatchResult (outputs sorted by record index)
//! ```
//!
//! Records never share mutable state; the only shared pieces are the
//! read-only template and metrics and the result accumulator.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::BatchConfig;
use crate::error::{MergeError, RecordError, Result};
use crate::font::TextMetrics;
use crate::model::{DataRecord, Template};
use crate::pdf::{PageSurface, PdfSurface};
use crate::render::render_document;

/// Longest key kept in a file name.
const MAX_KEY_LEN: usize = 64;

/// Shared flag to stop a running batch. Records already being rendered
/// finish; records not yet started are reported as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A record that produced no document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    /// Zero-based position in the input.
    pub index: usize,
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<RecordFailure>,
    /// Written documents, in record order.
    pub outputs: Vec<PathBuf>,
}

/// A record with its resolved key and output path.
struct Job<'a> {
    index: usize,
    key: String,
    record: &'a DataRecord,
    path: PathBuf,
}

#[derive(Default)]
struct Progress {
    succeeded: Vec<(usize, PathBuf)>,
    failed: Vec<RecordFailure>,
}

/// Render one document per record into `config.output_dir`.
///
/// Only an unusable output directory (or worker pool) is an `Err`; every
/// per-record problem is counted in the result.
pub fn render_batch(
    template: &Template,
    records: &[DataRecord],
    config: &BatchConfig,
    metrics: &dyn TextMetrics,
    cancel: &CancelToken,
) -> Result<BatchResult> {
    fs::create_dir_all(&config.output_dir).map_err(|source| MergeError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let started = Local::now();
    let jobs = plan_jobs(records, config, &started);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("letterpress-{}", i))
        .build()
        .map_err(|e| MergeError::Pool(e.to_string()))?;

    log::info!(
        "rendering {} records into {} ({} workers)",
        records.len(),
        config.output_dir.display(),
        pool.current_num_threads()
    );

    let progress = Mutex::new(Progress::default());
    pool.install(|| {
        jobs.par_iter().for_each(|job| {
            let outcome = if cancel.is_cancelled() {
                Err(RecordError::Cancelled)
            } else {
                render_one(template, job, config, metrics, &started)
            };

            let mut progress = lock(&progress);
            match outcome {
                Ok(()) => progress.succeeded.push((job.index, job.path.clone())),
                Err(e) => {
                    if !matches!(e, RecordError::Cancelled) {
                        log::warn!("record {} ({}) failed: {}", job.index + 1, job.key, e);
                    }
                    progress.failed.push(RecordFailure {
                        index: job.index,
                        key: job.key.clone(),
                        message: e.to_string(),
                    });
                }
            }
        });
    });

    let Progress {
        mut succeeded,
        mut failed,
    } = progress.into_inner().unwrap_or_else(|p| p.into_inner());
    succeeded.sort_by_key(|(i, _)| *i);
    failed.sort_by_key(|f| f.index);

    let result = BatchResult {
        total: records.len(),
        succeeded: succeeded.len(),
        failed: failed.len(),
        errors: failed,
        outputs: succeeded.into_iter().map(|(_, p)| p).collect(),
    };
    log::info!(
        "batch done: {} of {} succeeded, {} failed",
        result.succeeded,
        result.total,
        result.failed
    );
    Ok(result)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

fn render_one(
    template: &Template,
    job: &Job,
    config: &BatchConfig,
    metrics: &dyn TextMetrics,
    started: &DateTime<Local>,
) -> std::result::Result<(), RecordError> {
    let (width, height) = template.page.size.dimensions();
    let mut surface = PdfSurface::new(width, height)
        .with_metadata(template.metadata.clone())
        .with_creation_date(*started);
    let report = render_document(
        template,
        job.record,
        &job.key,
        metrics,
        config.field_errors,
        &mut surface,
    )?;
    surface.save(&job.path).map_err(|source| RecordError::Write {
        path: job.path.clone(),
        source,
    })?;
    log::debug!(
        "record {} -> {} ({} fields, {} skipped)",
        job.key,
        job.path.display(),
        report.fields_drawn,
        report.skipped.len()
    );
    Ok(())
}

/// Assign every record a key and a unique output path.
fn plan_jobs<'a>(
    records: &'a [DataRecord],
    config: &BatchConfig,
    started: &DateTime<Local>,
) -> Vec<Job<'a>> {
    let stamp = started.format("%Y%m%d_%H%M%S").to_string();
    let mut taken = HashSet::new();
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let key = record_key(record, config.key_column.as_deref(), index);
            let stem = format!("{}{}_{}", config.prefix, key, stamp);
            let path = unique_path(&config.output_dir, &stem, &mut taken);
            Job {
                index,
                key,
                record,
                path,
            }
        })
        .collect()
}

/// The sanitized key column value, or the 1-based record number.
pub fn record_key(record: &DataRecord, key_column: Option<&str>, index: usize) -> String {
    key_column
        .and_then(|col| record.get(col))
        .map(sanitize_key)
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| (index + 1).to_string())
}

fn sanitize_key(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_KEY_LEN)
        .collect();
    cleaned.trim_matches('_').to_string()
}

fn unique_path(dir: &Path, stem: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut path = dir.join(format!("{}.pdf", stem));
    let mut n = 2;
    while taken.contains(&path) || path.exists() {
        path = dir.join(format!("{}-{}.pdf", stem, n));
        n += 1;
    }
    taken.insert(path.clone());
    path
}
