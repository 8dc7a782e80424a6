//! Batch runner: many documents in, one [`BatchReport`] out.
//!
//! Documents are independent. A failure, a panic or a cancelled document
//! never stops the rest of the batch, and the report always has exactly one
//! result per input path, in input order.
//!
//! With `document_concurrency > 1` documents overlap, but results are still
//! collected through `StreamExt::buffered`, which yields in input order.

use crate::config::PipelineConfig;
use crate::document::document_stem;
use crate::error::{DocumentError, ScanlateError};
use crate::output::{BatchReport, PipelineResult};
use crate::pipeline::DocumentPipeline;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Requests cancellation of a running batch.
///
/// Documents already in flight finish normally; documents not yet started
/// are reported as `failure` with [`DocumentError::Cancelled`]. A cancelled
/// runner stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs a [`DocumentPipeline`] over a list of PDFs.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    pipeline: Arc<DocumentPipeline>,
    cancel: CancelHandle,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            pipeline: Arc::new(DocumentPipeline::new(config)),
            cancel: CancelHandle::default(),
        }
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.pipeline
    }

    /// A handle that can cancel this runner from another task or a signal
    /// handler.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Process every path and report one result per path, in input order.
    ///
    /// An empty list yields an empty report without touching any adapter.
    pub async fn run_batch<I, P>(&self, paths: I) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        let total = paths.len();
        let started = Instant::now();
        let config = self.pipeline.config();

        warn_duplicate_stems(&paths);
        info!(
            "Starting batch: {} document(s), document concurrency {}",
            total, config.document_concurrency
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(total);
        }

        let jobs = paths.into_iter().enumerate().map(|(index, path)| {
            let pipeline = Arc::clone(&self.pipeline);
            let cancel = self.cancel.clone();
            async move {
                let cb = pipeline.config().progress_callback.clone();
                let result = if cancel.is_cancelled() {
                    info!("Skipping {}: batch cancelled", path.display());
                    PipelineResult::failed(document_stem(&path), path, DocumentError::Cancelled, 0)
                } else {
                    if let Some(ref cb) = cb {
                        cb.on_document_start(index, total, &document_stem(&path));
                    }
                    pipeline.process(&path).await
                };
                if let Some(ref cb) = cb {
                    cb.on_document_complete(index, total, &result);
                }
                result
            }
        });
        let results: Vec<PipelineResult> = stream::iter(jobs)
            .buffered(config.document_concurrency)
            .collect()
            .await;

        let report = BatchReport::from_results(results, started.elapsed().as_millis() as u64);
        info!(
            "Batch complete: {} succeeded, {} partial, {} failed ({} cancelled) in {}ms",
            report.succeeded,
            report.partial,
            report.failed,
            report.cancelled,
            report.total_duration_ms
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_complete(&report);
        }
        report
    }

    /// Blocking wrapper around [`run_batch`](Self::run_batch).
    ///
    /// Creates its own Tokio runtime, so it must not be called from inside
    /// one.
    pub fn run_batch_blocking<I, P>(&self, paths: I) -> Result<BatchReport, ScanlateError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Ok(tokio::runtime::Runtime::new()
            .map_err(|e| ScanlateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.run_batch(paths)))
    }
}

/// List the PDFs directly inside `dir`, sorted by file name.
///
/// Matches the `.pdf` extension case-insensitively and does not recurse.
pub fn discover_documents(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ScanlateError> {
    let dir = dir.as_ref();
    let unreadable = |source| ScanlateError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Two inputs with the same stem write the same output files; the later one
/// wins.
fn warn_duplicate_stems(paths: &[PathBuf]) {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for path in paths {
        let stem = document_stem(path);
        if let Some(first) = seen.get(&stem) {
            warn!(
                "'{}' and '{}' share the id '{}'; the later document's outputs \
                 overwrite the earlier one's",
                first.display(),
                path.display(),
                stem
            );
        } else {
            seen.insert(stem, path);
        }
    }
}
