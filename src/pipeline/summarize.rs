//! Optional summary step: one call per document, bounded by
//! `summary_timeout`, written next to the translation.

use super::merge::write_atomic;
use crate::adapters::Summarizer;
use crate::config::PipelineConfig;
use crate::error::SummaryError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

/// Summarise `text` and write it to `config.summary_path(document_id)`.
///
/// `text` is the translation when there is one, so the summary reads in the
/// target language either way.
pub async fn summarize_document(
    summarizer: &Arc<dyn Summarizer>,
    text: &str,
    document_id: &str,
    config: &PipelineConfig,
) -> Result<PathBuf, SummaryError> {
    debug!("{}: summarising {} chars with {}", document_id, text.len(), summarizer.name());
    let summary = timeout(
        config.summary_timeout,
        summarizer.summarize(text, &config.target_lang),
    )
    .await
    .map_err(|_| SummaryError::Timeout {
        secs: config.summary_timeout.as_secs(),
    })??;

    let path = config.summary_path(document_id);
    write_atomic(&path, summary.trim())
        .await
        .map_err(|e| SummaryError::Output {
            path: path.clone(),
            detail: e.to_string(),
        })?;
    Ok(path)
}
