//! External-service boundaries the pipeline depends on but does not implement.
//!
//! Each trait is object-safe and `Send + Sync` so the pipeline can hold it as
//! `Arc<dyn …>` and share it across concurrently processed pages and
//! documents.
//!
//! | Trait | Implementations |
//! |-------|-----------------|
//! | [`Rasterizer`] | [`pdftoppm::PdftoppmRasterizer`], [`pdfium::PdfiumRasterizer`] |
//! | [`OcrEngine`]  | [`google_vision::GoogleVisionOcr`], [`llm::LlmVisionOcr`] |
//! | [`Translator`] | [`google_translate::GoogleTranslator`], [`llm::LlmTranslator`] |
//! | [`Summarizer`] | [`llm::LlmSummarizer`] |

use crate::error::{OcrError, RasterizationError, SummaryError, TranslationError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod encode;
pub mod google_translate;
pub mod google_vision;
pub mod llm;
pub mod pdfium;
pub mod pdftoppm;

pub use google_translate::GoogleTranslator;
pub use google_vision::GoogleVisionOcr;
pub use llm::{LlmSummarizer, LlmTranslator, LlmVisionOcr};
pub use pdfium::PdfiumRasterizer;
pub use pdftoppm::PdftoppmRasterizer;

/// Converts one PDF into page images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Render every page of `pdf` at `dpi` into `out_dir`.
    ///
    /// Returns image paths in ascending page order. An empty document is an
    /// error ([`RasterizationError::NoPages`]), never `Ok(vec![])`.
    async fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizationError>;

    /// Whether the backend can run at all, without touching a document.
    async fn check_available(&self) -> Result<(), RasterizationError> {
        Ok(())
    }
}

/// Extracts text from one page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Translates a text blob.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    /// `source_lang` of `None` lets the service detect the language.
    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

/// Describes a finished document in a few sentences.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    /// Summarise `text`, writing the summary in `target_lang`.
    async fn summarize(&self, text: &str, target_lang: &str) -> Result<String, SummaryError>;
}

/// Coarse failure class of a remote call, shared by the REST and LLM adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    Network,
    Auth,
    Quota,
    Api,
}

/// Classify an HTTP status code.
///
/// Gateway and availability errors (502/503/504) count as network failures
/// so they are retried.
pub(crate) fn classify_status(status: u16) -> FailureKind {
    match status {
        401 | 403 => FailureKind::Auth,
        429 => FailureKind::Quota,
        502..=504 => FailureKind::Network,
        _ => FailureKind::Api,
    }
}

/// Best-effort classification of a provider error message.
pub(crate) fn classify_message(message: &str) -> FailureKind {
    let m = message.to_lowercase();
    if m.contains("401") || m.contains("403") || m.contains("auth") || m.contains("api key") {
        FailureKind::Auth
    } else if m.contains("429") || m.contains("rate limit") || m.contains("quota") {
        FailureKind::Quota
    } else if m.contains("timeout")
        || m.contains("timed out")
        || m.contains("connection")
        || m.contains("network")
        || m.contains("502")
        || m.contains("503")
        || m.contains("504")
        || m.contains("unavailable")
        || m.contains("bad gateway")
    {
        FailureKind::Network
    } else {
        FailureKind::Api
    }
}

impl FailureKind {
    pub(crate) fn ocr(self, detail: String) -> OcrError {
        match self {
            FailureKind::Network => OcrError::Network(detail),
            FailureKind::Auth => OcrError::Auth(detail),
            FailureKind::Quota => OcrError::Quota(detail),
            FailureKind::Api => OcrError::Api(detail),
        }
    }

    pub(crate) fn translation(self, detail: String) -> TranslationError {
        match self {
            FailureKind::Network => TranslationError::Network(detail),
            FailureKind::Auth => TranslationError::Auth(detail),
            FailureKind::Quota => TranslationError::Quota(detail),
            FailureKind::Api => TranslationError::Api(detail),
        }
    }

    pub(crate) fn summary(self, detail: String) -> SummaryError {
        match self {
            FailureKind::Network => SummaryError::Network(detail),
            FailureKind::Auth => SummaryError::Auth(detail),
            FailureKind::Quota => SummaryError::Quota(detail),
            FailureKind::Api => SummaryError::Api(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(classify_status(401), FailureKind::Auth);
        assert_eq!(classify_status(403), FailureKind::Auth);
        assert_eq!(classify_status(429), FailureKind::Quota);
        assert_eq!(classify_status(502), FailureKind::Network);
        assert_eq!(classify_status(503), FailureKind::Network);
        assert_eq!(classify_status(504), FailureKind::Network);
        assert_eq!(classify_status(500), FailureKind::Api);
        assert_eq!(classify_status(501), FailureKind::Api);
        assert_eq!(classify_status(400), FailureKind::Api);
    }

    #[test]
    fn message_classes() {
        assert_eq!(classify_message("HTTP 401 Unauthorized"), FailureKind::Auth);
        assert_eq!(classify_message("Invalid API key provided"), FailureKind::Auth);
        assert_eq!(classify_message("Rate limit reached"), FailureKind::Quota);
        assert_eq!(classify_message("connection reset by peer"), FailureKind::Network);
        assert_eq!(classify_message("HTTP 503 Service Unavailable"), FailureKind::Network);
        assert_eq!(classify_message("model refused"), FailureKind::Api);
    }

    #[test]
    fn kind_maps_to_error_variants() {
        assert_eq!(FailureKind::Quota.ocr("x".into()), OcrError::Quota("x".into()));
        assert!(classify_status(503).ocr("blip".into()).is_transient());
        assert_eq!(
            FailureKind::Network.summary("z".into()),
            SummaryError::Network("z".into())
        );
        assert_eq!(
            FailureKind::Auth.translation("y".into()),
            TranslationError::Auth("y".into())
        );
    }
}
