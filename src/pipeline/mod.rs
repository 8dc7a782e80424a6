//! The document pipeline: one PDF in, one [`PipelineResult`] out.
//!
//! Each submodule implements exactly one step. The adapters behind the
//! rasterize, OCR, translate and summarize steps live in [`crate::adapters`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ ocr ──▶ merge ──▶ translate ──▶ summarize
//! (%PDF)    (adapter)    (pages)  (.ocr.txt) (<lang>/<stem>.txt) (.summary.txt)
//! ```
//!
//! 1. [`input`]     : reject missing, unreadable and non-PDF paths
//! 2. rasterize     : the configured [`crate::adapters::Rasterizer`] writes
//!    page images into a per-document temporary directory
//! 3. [`ocr`]       : bounded-concurrency OCR with timeout and retry
//! 4. [`merge`]     : join page texts in page order, write atomically
//! 5. [`translate`] : optional; chunked, decoded, written atomically
//! 6. [`summarize`] : optional; advisory, never changes the status
//!
//! The temporary directory is a [`tempfile::TempDir`] owned by the call, so
//! it is removed on every exit path, panics included.

pub mod input;
pub mod merge;
pub mod ocr;
pub mod summarize;
pub mod translate;

use crate::adapters::Translator;
use crate::config::PipelineConfig;
use crate::document::{document_stem, Document, DocumentState};
use crate::error::{DocumentError, PageError, RasterizationError, TranslationError};
use crate::output::{classify, DocumentStatus, PipelineResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Runs single documents through rasterize → OCR → merge → translate →
/// summarize.
///
/// Cheap to share: wrap it in an `Arc` to drive it from several tasks.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    config: PipelineConfig,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one PDF.
    ///
    /// Never fails and never panics: every problem, including a panic inside
    /// an adapter, is reported through the returned [`PipelineResult`].
    pub async fn process(&self, document_path: impl AsRef<Path>) -> PipelineResult {
        let source = document_path.as_ref().to_path_buf();
        let started = Instant::now();

        match AssertUnwindSafe(self.run(&source, started)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let id = document_stem(&source);
                let detail = panic_message(payload.as_ref());
                error!("{}: panic during processing: {}", id, detail);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_document_state(&id, DocumentState::Failed);
                }
                let error = DocumentError::Unexpected { detail };
                PipelineResult::failed(id, source, error, elapsed_ms(started))
            }
        }
    }

    async fn run(&self, source: &Path, started: Instant) -> PipelineResult {
        let config = &self.config;
        let mut doc = Document::discover(source);
        info!("Processing {}", source.display());

        // ── Step 1: Validate input ───────────────────────────────────────────
        if let Err(e) = input::validate_pdf(source) {
            return self.fail(&mut doc, e, started);
        }

        // ── Step 2: Per-document working area ────────────────────────────────
        let workspace = match tempfile::Builder::new()
            .prefix(&format!("scanlate-{}-", doc.id()))
            .tempdir_in(config.temp_root())
        {
            Ok(dir) => dir,
            Err(e) => {
                let err = DocumentError::Workspace {
                    detail: format!("{}: {}", config.temp_root().display(), e),
                };
                return self.fail(&mut doc, err, started);
            }
        };
        debug!("{}: working area {}", doc.id(), workspace.path().display());

        // ── Step 3: Rasterize ────────────────────────────────────────────────
        self.transition(&mut doc, DocumentState::Rasterizing);
        let rasterized = timeout(
            config.rasterize_timeout,
            config.rasterizer.rasterize(source, config.dpi, workspace.path()),
        )
        .await;
        let images = match rasterized {
            Ok(Ok(images)) if images.is_empty() => Err(RasterizationError::NoPages {
                path: source.to_path_buf(),
            }),
            Ok(Ok(images)) => Ok(images),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RasterizationError::Timeout {
                secs: config.rasterize_timeout.as_secs(),
            }),
        };
        let images = match images {
            Ok(images) => images,
            Err(e) => return self.fail(&mut doc, e.into(), started),
        };

        doc.attach_pages(images);
        let page_count = doc.pages().len();
        info!("{}: {} page(s) rasterized with {}", doc.id(), page_count, config.rasterizer.name());
        if let Some(ref cb) = config.progress_callback {
            cb.on_pages_ready(doc.id(), page_count);
        }

        // ── Step 4: OCR ──────────────────────────────────────────────────────
        self.transition(&mut doc, DocumentState::Ocring);
        let pages: Vec<(usize, PathBuf)> = doc
            .pages()
            .iter()
            .map(|p| (p.index, p.image.clone()))
            .collect();
        let outcomes = ocr::recognize_pages(doc.id(), &pages, config).await;
        for (page, outcome) in doc.pages_mut().iter_mut().zip(&outcomes) {
            page.text = outcome.result.as_ref().ok().cloned();
        }
        let page_errors: Vec<PageError> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().cloned())
            .collect();
        let ocr_pages_ok = page_count - page_errors.len();

        if ocr_pages_ok == 0 {
            let err = DocumentError::AllPagesFailed { total: page_count };
            return PipelineResult {
                page_errors,
                page_count,
                ..self.fail(&mut doc, err, started)
            };
        }
        if !page_errors.is_empty() {
            warn!("{}: {}/{} page(s) failed OCR", doc.id(), page_errors.len(), page_count);
        }

        // ── Step 5: Merge ────────────────────────────────────────────────────
        self.transition(&mut doc, DocumentState::Merging);
        let merged = merge::merge_pages(&outcomes);
        let merged_path = config.merged_text_path(doc.id());
        if let Err(e) = merge::write_atomic(&merged_path, &merged).await {
            let err = DocumentError::Output {
                path: merged_path,
                detail: e.to_string(),
            };
            return PipelineResult {
                page_errors,
                page_count,
                ocr_pages_ok,
                ..self.fail(&mut doc, err, started)
            };
        }
        debug!("{}: merged text written to {}", doc.id(), merged_path.display());

        // ── Step 6: Translate ────────────────────────────────────────────────
        let mut translated_text_path = None;
        let mut translated_text = None;
        let mut translation_error = None;
        let translation_ok = match config.translator {
            None => None,
            Some(ref translator) => {
                self.transition(&mut doc, DocumentState::Translating);
                if merged.trim().is_empty() {
                    warn!("{}: OCR produced no text, translation skipped", doc.id());
                    Some(false)
                } else {
                    match self.translate(translator, &merged, doc.id()).await {
                        Ok((path, text)) => {
                            translated_text_path = Some(path);
                            translated_text = Some(text);
                            Some(true)
                        }
                        Err(e) => {
                            warn!("{}: translation failed: {}", doc.id(), e);
                            translation_error = Some(e);
                            Some(false)
                        }
                    }
                }
            }
        };

        // ── Step 7: Summarize ────────────────────────────────────────────────
        let mut summary_path = None;
        let mut summary_error = None;
        if let Some(ref summarizer) = config.summarizer {
            let text = translated_text.as_deref().unwrap_or(merged.as_str());
            if text.trim().is_empty() {
                debug!("{}: no text, summary skipped", doc.id());
            } else {
                self.transition(&mut doc, DocumentState::Summarizing);
                match summarize::summarize_document(summarizer, text, doc.id(), config).await {
                    Ok(path) => summary_path = Some(path),
                    Err(e) => {
                        warn!("{}: summary failed: {}", doc.id(), e);
                        summary_error = Some(e);
                    }
                }
            }
        }

        // ── Step 8: Classify ─────────────────────────────────────────────────
        self.transition(&mut doc, DocumentState::Done);
        let status = classify(page_count, ocr_pages_ok, translation_ok);
        debug_assert!(status != DocumentStatus::Failure);

        if let Err(e) = workspace.close() {
            warn!("{}: could not remove working area: {}", doc.id(), e);
        }

        let duration_ms = elapsed_ms(started);
        info!(
            "{}: {} ({}/{} pages, {}ms)",
            doc.id(),
            status,
            ocr_pages_ok,
            page_count,
            duration_ms
        );

        PipelineResult {
            document_id: doc.id().to_string(),
            source_path: source.to_path_buf(),
            status,
            merged_text_path: Some(merged_path),
            translated_text_path,
            page_errors,
            error: None,
            translation_error,
            summary_path,
            summary_error,
            page_count,
            ocr_pages_ok,
            duration_ms,
        }
    }

    async fn translate(
        &self,
        translator: &Arc<dyn Translator>,
        merged: &str,
        document_id: &str,
    ) -> Result<(PathBuf, String), TranslationError> {
        let text = translate::translate_text(translator, merged, &self.config).await?;
        let path = self.config.translated_text_path(document_id);
        merge::write_atomic(&path, &text)
            .await
            .map_err(|e| TranslationError::Output {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        debug!("{}: translation written to {}", document_id, path.display());
        Ok((path, text))
    }

    fn transition(&self, doc: &mut Document, next: DocumentState) {
        if doc.advance(next) {
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_document_state(doc.id(), next);
            }
        }
    }

    fn fail(&self, doc: &mut Document, error: DocumentError, started: Instant) -> PipelineResult {
        warn!("{}: failed: {}", doc.id(), error);
        self.transition(doc, DocumentState::Failed);
        PipelineResult::failed(doc.id(), doc.source(), error, elapsed_ms(started))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
