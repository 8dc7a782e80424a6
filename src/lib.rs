//! # scanlate
//!
//! Batch-digitise scanned PDFs: rasterize every page, OCR it, merge the page
//! texts into one document and optionally translate the result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      check the path and the %PDF magic
//!  ├─ 2. Rasterize  pdftoppm or pdfium, one PNG per page, in a temp dir
//!  ├─ 3. OCR        concurrent per-page calls (Google Vision or a VLM)
//!  ├─ 4. Merge      pages in order, one blank line apart → <work>/<stem>.ocr.txt
//!  ├─ 5. Translate  optional (Google Translate or an LLM) → <out>/<lang>/<stem>.txt
//!  └─ 6. Summarize  optional (an LLM) → <out>/<lang>/<stem>.summary.txt
//! ```
//!
//! A page that fails OCR never fails its document, and a document that fails
//! never stops its batch. Every outcome is recorded in a [`PipelineResult`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scanlate::adapters::{GoogleTranslator, GoogleVisionOcr, PdftoppmRasterizer};
//! use scanlate::{discover_documents, BatchRunner, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("GOOGLE_API_KEY")?;
//!     let config = PipelineConfig::builder(
//!         Arc::new(PdftoppmRasterizer::new()),
//!         Arc::new(GoogleVisionOcr::new(key.clone())),
//!     )
//!     .translator(Arc::new(GoogleTranslator::new(key)))
//!     .target_lang("en")
//!     .build()?;
//!
//!     let runner = BatchRunner::new(config);
//!     let report = runner.run_batch(discover_documents("letters/inbox")?).await;
//!     for r in &report.results {
//!         eprintln!("{}: {}", r.document_id, r.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | The `scanlate` binary (clap, anyhow, tracing-subscriber, indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scanlate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod adapters;
pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod postprocess;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{discover_documents, BatchRunner, CancelHandle};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use document::{Document, DocumentState, Page};
pub use error::{
    DocumentError, OcrError, PageError, RasterizationError, ScanlateError, SummaryError,
    TranslationError,
};
pub use output::{BatchReport, DocumentStatus, PipelineResult};
pub use pipeline::DocumentPipeline;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
