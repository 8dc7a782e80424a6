//! Progress-callback trait for batch, document and page events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`]. Callers can
//! forward events to a terminal progress bar, a channel or a log without the
//! library knowing how the host application reports status.
//!
//! # Example
//!
//! ```rust
//! use scanlate::{BatchProgressCallback, DocumentStatus, PipelineResult};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for FailureCounter {
//!     fn on_document_complete(&self, _index: usize, _total: usize, result: &PipelineResult) {
//!         if result.status == DocumentStatus::Failure {
//!             self.failed.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::document::DocumentState;
use crate::output::{BatchReport, PipelineResult};
use std::sync::Arc;

/// Called by the pipeline and the batch runner as work progresses.
///
/// All methods default to no-ops. Pages of one document, and documents of one
/// batch when `document_concurrency > 1`, may report concurrently, so
/// implementations must synchronise shared state.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first document starts.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document is picked up. `index` is 0-based input order.
    fn on_document_start(&self, index: usize, total: usize, document_id: &str) {
        let _ = (index, total, document_id);
    }

    /// Called on every lifecycle transition.
    fn on_document_state(&self, document_id: &str, state: DocumentState) {
        let _ = (document_id, state);
    }

    /// Called when rasterization has produced the page list.
    fn on_pages_ready(&self, document_id: &str, page_count: usize) {
        let _ = (document_id, page_count);
    }

    /// Called when a page OCR'd successfully.
    fn on_page_complete(
        &self,
        document_id: &str,
        page: usize,
        total_pages: usize,
        text_len: usize,
    ) {
        let _ = (document_id, page, total_pages, text_len);
    }

    /// Called when a page failed after all retries.
    fn on_page_error(&self, document_id: &str, page: usize, total_pages: usize, error: &str) {
        let _ = (document_id, page, total_pages, error);
    }

    /// Called once per input document, cancelled ones included.
    fn on_document_complete(&self, index: usize, total: usize, result: &PipelineResult) {
        let _ = (index, total, result);
    }

    /// Called once after the last document.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
