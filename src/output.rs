//! Result types produced by the pipeline and the batch runner.

use crate::error::{DocumentError, PageError, SummaryError, TranslationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Overall outcome of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Every page OCR'd and, if configured, translation succeeded.
    Success,
    /// Some output is usable but at least one page or the translation failed.
    Partial,
    /// Nothing usable was produced.
    Failure,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentStatus::Success => "success",
            DocumentStatus::Partial => "partial",
            DocumentStatus::Failure => "failure",
        })
    }
}

/// Outcome of processing one document. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// File stem of the source PDF.
    pub document_id: String,
    pub source_path: PathBuf,
    pub status: DocumentStatus,
    /// `<work_dir>/<stem>.ocr.txt`, when written.
    pub merged_text_path: Option<PathBuf>,
    /// `<out_dir>/<target_lang>/<stem>.txt`, when written.
    pub translated_text_path: Option<PathBuf>,
    /// Per-page OCR failures, in page order.
    pub page_errors: Vec<PageError>,
    /// Why the document failed, for `failure` results.
    pub error: Option<DocumentError>,
    /// Why translation failed, if it was attempted and failed.
    pub translation_error: Option<TranslationError>,
    /// `<out_dir>/<target_lang>/<stem>.summary.txt`, when written.
    pub summary_path: Option<PathBuf>,
    /// Why the summary failed. Does not affect `status`.
    pub summary_error: Option<SummaryError>,
    /// Pages produced by the rasterizer (0 if it failed).
    pub page_count: usize,
    /// Pages OCR'd without error.
    pub ocr_pages_ok: usize,
    pub duration_ms: u64,
}

impl PipelineResult {
    /// A `failure` result for a document that never produced pages.
    pub fn failed(
        document_id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        error: DocumentError,
        duration_ms: u64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            source_path: source_path.into(),
            status: DocumentStatus::Failure,
            merged_text_path: None,
            translated_text_path: None,
            page_errors: Vec::new(),
            error: Some(error),
            translation_error: None,
            summary_path: None,
            summary_error: None,
            page_count: 0,
            ocr_pages_ok: 0,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DocumentStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == DocumentStatus::Failure
    }
}

/// Decide a document's status from what happened to it.
///
/// `translation_ok` is `None` when no translator is configured.
pub fn classify(
    pages_total: usize,
    pages_ok: usize,
    translation_ok: Option<bool>,
) -> DocumentStatus {
    if pages_total == 0 || pages_ok == 0 {
        return DocumentStatus::Failure;
    }
    let all_pages = pages_ok == pages_total;
    match (all_pages, translation_ok) {
        (true, None) | (true, Some(true)) => DocumentStatus::Success,
        _ => DocumentStatus::Partial,
    }
}

/// One result per input document, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<PipelineResult>,
    /// Documents that were run through the pipeline (not cancelled).
    pub processed: usize,
    /// Results with status `failure`, cancelled ones included.
    pub failed: usize,
    pub succeeded: usize,
    pub partial: usize,
    /// Documents skipped because the batch was cancelled.
    pub cancelled: usize,
    pub total_duration_ms: u64,
}

impl BatchReport {
    /// Tally counts from `results`.
    pub fn from_results(results: Vec<PipelineResult>, total_duration_ms: u64) -> Self {
        let count = |s: DocumentStatus| results.iter().filter(|r| r.status == s).count();
        let cancelled = results
            .iter()
            .filter(|r| matches!(r.error, Some(DocumentError::Cancelled)))
            .count();
        Self {
            processed: results.len() - cancelled,
            failed: count(DocumentStatus::Failure),
            succeeded: count(DocumentStatus::Success),
            partial: count(DocumentStatus::Partial),
            cancelled,
            total_duration_ms,
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when no document ended in `failure`.
    pub fn all_usable(&self) -> bool {
        self.failed == 0
    }
}
