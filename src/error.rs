//! Error types for the scanlate library.
//!
//! Failures are split by how far they are allowed to travel:
//!
//! * [`RasterizationError`]: fatal to one document. No page exists yet, so
//!   nothing can be OCR'd.
//!
//! * [`OcrError`]: recoverable, scoped to one page. Wrapped in a
//!   [`PageError`] and stored in [`crate::output::PipelineResult`]; the
//!   remaining pages are still processed.
//!
//! * [`TranslationError`]: recoverable, scoped to one document. The OCR text
//!   is still written and the document degrades to `partial`.
//!
//! * [`SummaryError`]: advisory. Recorded in the result, never changes the
//!   document's status.
//!
//! * [`DocumentError`]: the reason a document ended in `failure`, stored in
//!   its result. Never returned as `Err` from the pipeline or the batch.
//!
//! * [`ScanlateError`]: fatal library errors that happen before any document
//!   is touched (bad configuration, missing provider).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal library errors returned as `Err(ScanlateError)`.
///
/// Document and page failures never surface here; they are recorded in
/// [`crate::output::PipelineResult`].
#[derive(Debug, Error)]
pub enum ScanlateError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An adapter backend could not be constructed (missing API key etc.).
    #[error("Provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not list an inbox directory.
    #[error("Failed to read directory '{path}': {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The PDF could not be turned into page images.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterizationError {
    /// The rasterizer tool or library is not installed.
    #[error("Rasterizer '{tool}' is not available: {detail}")]
    ToolMissing { tool: String, detail: String },

    /// The PDF could not be opened or parsed.
    #[error("Cannot read PDF '{path}': {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// The rasterizer ran but produced no page images.
    #[error("Rasterizer produced no pages for '{path}'")]
    NoPages { path: PathBuf },

    /// The rasterizer exited abnormally or failed on a page.
    #[error("Rasterization failed: {detail}")]
    Failed { detail: String },

    /// The rasterizer did not finish in time.
    #[error("Rasterization timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// A single page could not be recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcrError {
    /// Transport failure (DNS, connection reset, TLS), or a gateway or
    /// availability error (HTTP 502-504).
    #[error("network error: {0}")]
    Network(String),

    /// Credentials rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limit or quota exhausted (HTTP 429).
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service reported an error for this image.
    #[error("service error: {0}")]
    Api(String),

    /// The call exceeded the per-page timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The page image could not be read from the working area.
    #[error("cannot read page image: {0}")]
    Io(String),
}

impl OcrError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OcrError::Network(_) | OcrError::Quota(_) | OcrError::Timeout { .. }
        )
    }
}

/// The merged text could not be translated.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("service error: {0}")]
    Api(String),

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The translated text could not be written.
    #[error("failed to write '{path}': {detail}")]
    Output { path: PathBuf, detail: String },
}

/// The document summary could not be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("service error: {0}")]
    Api(String),

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("failed to write '{path}': {detail}")]
    Output { path: PathBuf, detail: String },
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Page {page}: OCR failed after {attempts} attempt(s): {error}")]
pub struct PageError {
    /// 1-based page index.
    pub page: usize,
    /// Number of calls made for this page.
    pub attempts: u32,
    pub error: OcrError,
}

/// Why a document ended in `failure`.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentError {
    /// The input is missing, unreadable, or not a PDF.
    #[error("Invalid input '{path}': {detail}")]
    InvalidInput { path: PathBuf, detail: String },

    /// The per-document temporary working area could not be created.
    #[error("Cannot create working area: {detail}")]
    Workspace { detail: String },

    #[error(transparent)]
    Rasterization(#[from] RasterizationError),

    /// Every page failed OCR; details are in the page errors.
    #[error("All {total} pages failed OCR")]
    AllPagesFailed { total: usize },

    /// The merged OCR text could not be written.
    #[error("Failed to write '{path}': {detail}")]
    Output { path: PathBuf, detail: String },

    /// A panic or other unexpected error escaped an adapter.
    #[error("Unexpected error: {detail}")]
    Unexpected { detail: String },

    /// The batch was cancelled before this document started.
    #[error("Cancelled before processing started")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_display() {
        let e = PageError {
            page: 3,
            attempts: 2,
            error: OcrError::Timeout { secs: 30 },
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"), "got: {msg}");
        assert!(msg.contains("30s"), "got: {msg}");
    }

    #[test]
    fn transient_classification() {
        assert!(OcrError::Network("reset".into()).is_transient());
        assert!(OcrError::Quota("429".into()).is_transient());
        assert!(OcrError::Timeout { secs: 1 }.is_transient());
        assert!(!OcrError::Auth("bad key".into()).is_transient());
        assert!(!OcrError::MalformedResponse("eof".into()).is_transient());
        assert!(!OcrError::Api("bad image".into()).is_transient());
    }

    #[test]
    fn rasterization_error_is_transparent_in_document_error() {
        let e: DocumentError = RasterizationError::NoPages {
            path: PathBuf::from("a.pdf"),
        }
        .into();
        assert_eq!(e.to_string(), "Rasterizer produced no pages for 'a.pdf'");
    }

    #[test]
    fn document_error_serialises() {
        let e = DocumentError::AllPagesFailed { total: 4 };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("AllPagesFailed"), "got: {json}");
    }
}
