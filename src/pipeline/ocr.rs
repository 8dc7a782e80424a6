//! Per-page OCR: bounded concurrency, per-call timeout, transient retries.
//!
//! ## Ordering
//!
//! Pages are issued up to `concurrency_limit` at a time through
//! `StreamExt::buffered`, which yields results in *input* order regardless of
//! completion order. Merged output therefore never depends on which page the
//! service answered first.
//!
//! ## Retry Strategy
//!
//! Only transient failures (network, quota, timeout) are retried, with
//! exponential backoff `retry_backoff_ms * 2^(attempt-1)`, capped at
//! [`MAX_BACKOFF_MS`]. Each page's attempts run strictly one after another,
//! so a page is never in flight twice.

use crate::adapters::OcrEngine;
use crate::config::PipelineConfig;
use crate::error::{OcrError, PageError};
use crate::postprocess::clean_page_text;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Delay before retry number `retry` (1-based). Saturates instead of
/// overflowing for large retry counts.
pub fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// What happened to one page.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// 1-based page index.
    pub page: usize,
    pub result: Result<String, PageError>,
}

/// OCR one page image, applying the timeout and retry policy.
///
/// Never returns `Err`: failures become a [`PageError`] in the outcome so one
/// bad page cannot abort its document.
pub async fn recognize_page(
    ocr: &Arc<dyn OcrEngine>,
    page: usize,
    image: &Path,
    config: &PipelineConfig,
) -> PageOutcome {
    let secs = config.per_page_timeout.as_secs();
    let mut attempts = 0u32;

    loop {
        if attempts > 0 {
            let backoff = backoff_delay(config.retry_backoff_ms, attempts);
            debug!(
                "Page {}: retry {}/{} after {}ms",
                page,
                attempts,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }
        attempts += 1;

        let error = match timeout(config.per_page_timeout, ocr.recognize(image)).await {
            Ok(Ok(text)) => {
                return PageOutcome {
                    page,
                    result: Ok(clean_page_text(&text)),
                };
            }
            Ok(Err(e)) => e,
            Err(_) => OcrError::Timeout { secs },
        };

        warn!("Page {}: attempt {} failed: {}", page, attempts, error);
        if !error.is_transient() || attempts > config.max_retries {
            return PageOutcome {
                page,
                result: Err(PageError {
                    page,
                    attempts,
                    error,
                }),
            };
        }
    }
}

/// OCR all pages of a document, returning outcomes in ascending page order.
///
/// `pages` is `(page_index, image_path)` in ascending order.
pub async fn recognize_pages(
    document_id: &str,
    pages: &[(usize, PathBuf)],
    config: &PipelineConfig,
) -> Vec<PageOutcome> {
    let total_pages = pages.len();
    stream::iter(pages.iter().map(|(page, image)| {
        let ocr = Arc::clone(&config.ocr);
        async move {
            let outcome = recognize_page(&ocr, *page, image, config).await;
            if let Some(ref cb) = config.progress_callback {
                match &outcome.result {
                    Ok(text) => cb.on_page_complete(document_id, *page, total_pages, text.len()),
                    Err(e) => {
                        cb.on_page_error(document_id, *page, total_pages, &e.error.to_string())
                    }
                }
            }
            outcome
        }
    }))
    .buffered(config.concurrency_limit)
    .collect()
    .await
}
