//! Configuration for the document pipeline and the batch runner.
//!
//! Everything the pipeline needs, adapters included, lives in one
//! [`PipelineConfig`] built through [`PipelineConfigBuilder`]. There is no
//! ambient state: the same config can drive many pipelines, and two runs with
//! equal configs and inputs produce the same outputs.

use crate::adapters::{OcrEngine, Rasterizer, Summarizer, Translator};
use crate::error::ScanlateError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// DPI bounds accepted by the builder.
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;

/// Configuration for a [`crate::pipeline::DocumentPipeline`] and
/// [`crate::batch::BatchRunner`].
///
/// # Example
/// ```rust,no_run
/// use scanlate::adapters::{GoogleTranslator, GoogleVisionOcr, PdftoppmRasterizer};
/// use scanlate::PipelineConfig;
/// use std::sync::Arc;
///
/// let key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();
/// let config = PipelineConfig::builder(
///     Arc::new(PdftoppmRasterizer::new()),
///     Arc::new(GoogleVisionOcr::new(key.clone())),
/// )
/// .translator(Arc::new(GoogleTranslator::new(key)))
/// .dpi(300)
/// .concurrency_limit(4)
/// .build()
/// .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub ocr: Arc<dyn OcrEngine>,
    /// No translator means the pipeline stops after merging.
    pub translator: Option<Arc<dyn Translator>>,
    /// Optional document summary, written next to the translation.
    pub summarizer: Option<Arc<dyn Summarizer>>,

    /// Rasterization DPI. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Bound on each OCR call. Default: 30 s.
    pub per_page_timeout: Duration,

    /// Concurrent OCR calls within one document. Default: 4.
    pub concurrency_limit: usize,

    /// Documents processed at once by the batch runner. Default: 1.
    pub document_concurrency: usize,

    /// Extra attempts per page on transient OCR failures. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay; doubles after each attempt. Default: 500 ms.
    pub retry_backoff_ms: u64,

    /// Bound on the whole rasterization step. Default: 300 s.
    pub rasterize_timeout: Duration,

    /// Bound on each translation call. Default: 120 s.
    pub translation_timeout: Duration,

    /// Bound on the summary call. Default: 120 s.
    pub summary_timeout: Duration,

    /// Maximum characters per translation request. Default: 5000.
    pub translation_chunk_chars: usize,

    /// Where merged OCR text goes: `<work_dir>/<stem>.ocr.txt`. Default: `work`.
    pub work_dir: PathBuf,

    /// Where translations go: `<out_dir>/<target_lang>/<stem>.txt`. Default: `out`.
    pub out_dir: PathBuf,

    /// Default: `en`.
    pub target_lang: String,

    /// `None` lets the translator detect the language.
    pub source_lang: Option<String>,

    /// Parent of the per-document temporary directories. Default: system temp dir.
    pub temp_root: Option<PathBuf>,

    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("rasterizer", &self.rasterizer.name())
            .field("ocr", &self.ocr.name())
            .field("translator", &self.translator.as_ref().map(|t| t.name().to_string()))
            .field("summarizer", &self.summarizer.as_ref().map(|s| s.name().to_string()))
            .field("dpi", &self.dpi)
            .field("per_page_timeout", &self.per_page_timeout)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("document_concurrency", &self.document_concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("rasterize_timeout", &self.rasterize_timeout)
            .field("translation_timeout", &self.translation_timeout)
            .field("summary_timeout", &self.summary_timeout)
            .field("translation_chunk_chars", &self.translation_chunk_chars)
            .field("work_dir", &self.work_dir)
            .field("out_dir", &self.out_dir)
            .field("target_lang", &self.target_lang)
            .field("source_lang", &self.source_lang)
            .field("temp_root", &self.temp_root)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Start a builder. Rasterizer and OCR engine are mandatory.
    pub fn builder(
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrEngine>,
    ) -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: PipelineConfig {
                rasterizer,
                ocr,
                translator: None,
                summarizer: None,
                dpi: 300,
                per_page_timeout: Duration::from_secs(30),
                concurrency_limit: 4,
                document_concurrency: 1,
                max_retries: 2,
                retry_backoff_ms: 500,
                rasterize_timeout: Duration::from_secs(300),
                translation_timeout: Duration::from_secs(120),
                summary_timeout: Duration::from_secs(120),
                translation_chunk_chars: 5000,
                work_dir: PathBuf::from("work"),
                out_dir: PathBuf::from("out"),
                target_lang: "en".to_string(),
                source_lang: None,
                temp_root: None,
                progress_callback: None,
            },
        }
    }

    /// `<work_dir>/<stem>.ocr.txt`
    pub fn merged_text_path(&self, stem: &str) -> PathBuf {
        self.work_dir.join(format!("{stem}.ocr.txt"))
    }

    /// `<out_dir>/<target_lang>/<stem>.txt`
    pub fn translated_text_path(&self, stem: &str) -> PathBuf {
        self.out_dir.join(&self.target_lang).join(format!("{stem}.txt"))
    }

    /// `<out_dir>/<target_lang>/<stem>.summary.txt`
    pub fn summary_path(&self, stem: &str) -> PathBuf {
        self.out_dir
            .join(&self.target_lang)
            .join(format!("{stem}.summary.txt"))
    }

    /// Directory the per-document temporary areas are created in.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.config.summarizer = Some(summarizer);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn per_page_timeout(mut self, timeout: Duration) -> Self {
        self.config.per_page_timeout = timeout;
        self
    }

    pub fn concurrency_limit(mut self, n: usize) -> Self {
        self.config.concurrency_limit = n.max(1);
        self
    }

    pub fn document_concurrency(mut self, n: usize) -> Self {
        self.config.document_concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn rasterize_timeout(mut self, timeout: Duration) -> Self {
        self.config.rasterize_timeout = timeout;
        self
    }

    pub fn translation_timeout(mut self, timeout: Duration) -> Self {
        self.config.translation_timeout = timeout;
        self
    }

    pub fn summary_timeout(mut self, timeout: Duration) -> Self {
        self.config.summary_timeout = timeout;
        self
    }

    pub fn translation_chunk_chars(mut self, n: usize) -> Self {
        self.config.translation_chunk_chars = n;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    pub fn target_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.target_lang = lang.into();
        self
    }

    pub fn source_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.source_lang = Some(lang.into());
        self
    }

    pub fn temp_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.temp_root = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ScanlateError> {
        let c = &self.config;
        if c.dpi < MIN_DPI || c.dpi > MAX_DPI {
            return Err(ScanlateError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.per_page_timeout.is_zero() {
            return Err(ScanlateError::InvalidConfig(
                "Per-page timeout must be greater than zero".into(),
            ));
        }
        if c.translation_chunk_chars < 100 {
            return Err(ScanlateError::InvalidConfig(format!(
                "Translation chunk size must be ≥ 100 characters, got {}",
                c.translation_chunk_chars
            )));
        }
        if !is_language_code(&c.target_lang) {
            return Err(ScanlateError::InvalidConfig(format!(
                "Target language '{}' is not a language code (e.g. en, de, pt-BR)",
                c.target_lang
            )));
        }
        if let Some(ref src) = c.source_lang {
            if !is_language_code(src) {
                return Err(ScanlateError::InvalidConfig(format!(
                    "Source language '{src}' is not a language code (e.g. en, de, pt-BR)"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Loose BCP-47 check: a 2–3 letter primary tag with optional subtags.
/// Also keeps the target language safe to use as a directory name.
fn is_language_code(s: &str) -> bool {
    let mut parts = s.split('-');
    let primary_ok = parts
        .next()
        .map(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);
    primary_ok
        && parts.all(|p| {
            (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric())
        })
}
