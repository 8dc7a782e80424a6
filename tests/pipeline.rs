//! Integration tests for the document pipeline and the batch runner.
//!
//! All adapters are in-file stubs, so these tests need no network access and
//! no rasterizer installed.
//!
//! Test PDFs are plain files: the first line is the `%PDF-1.4` magic and
//! every following line scripts one page for the stubs:
//!
//! | Line          | OCR behaviour                          |
//! |---------------|----------------------------------------|
//! | `text`        | returns `text`                         |
//! | `text@40`     | waits 40 ms, then returns `text`       |
//! | `fail`        | fails with a permanent service error   |
//! | `flaky`       | fails with a transient network error   |
//! | `panic`       | panics                                 |

use async_trait::async_trait;
use scanlate::adapters::{OcrEngine, Rasterizer, Summarizer, Translator};
use scanlate::{
    BatchProgressCallback, BatchRunner, CancelHandle, DocumentError, DocumentPipeline,
    DocumentStatus, OcrError, PipelineConfig, PipelineConfigBuilder, PipelineResult,
    RasterizationError, SummaryError, TranslationError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Stub adapters ────────────────────────────────────────────────────────────

/// Writes one `page-N.png` per script line of the input file.
#[derive(Default)]
struct StubRasterizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Rasterizer for StubRasterizer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        _dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = tokio::fs::read_to_string(pdf)
            .await
            .map_err(|e| RasterizationError::Unreadable {
                path: pdf.to_path_buf(),
                detail: e.to_string(),
            })?;
        let mut pages = Vec::new();
        for (i, script) in content.lines().skip(1).enumerate() {
            let path = out_dir.join(format!("page-{}.png", i + 1));
            tokio::fs::write(&path, script)
                .await
                .map_err(|e| RasterizationError::Failed {
                    detail: e.to_string(),
                })?;
            pages.push(path);
        }
        Ok(pages)
    }
}

struct FailingRasterizer;

#[async_trait]
impl Rasterizer for FailingRasterizer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        _dpi: u32,
        _out_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizationError> {
        Err(RasterizationError::Unreadable {
            path: pdf.to_path_buf(),
            detail: "corrupt xref table".to_string(),
        })
    }
}

/// Interprets the page script written by [`StubRasterizer`].
#[derive(Default)]
struct StubOcr {
    calls: AtomicUsize,
}

#[async_trait]
impl OcrEngine for StubOcr {
    fn name(&self) -> &str {
        "stub"
    }

    async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = tokio::fs::read_to_string(image)
            .await
            .map_err(|e| OcrError::Io(e.to_string()))?;
        match script.as_str() {
            "fail" => Err(OcrError::Api("unreadable handwriting".to_string())),
            "flaky" => Err(OcrError::Network("connection reset".to_string())),
            "panic" => panic!("ocr stub exploded"),
            _ => match script.rsplit_once('@') {
                Some((text, ms)) => {
                    let ms: u64 = ms.parse().unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(text.to_string())
                }
                None => Ok(script),
            },
        }
    }
}

/// Upper-cases its input and records the source language it was given.
#[derive(Default)]
struct StubTranslator {
    calls: AtomicUsize,
    sources: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl Translator for StubTranslator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        _target: &str,
    ) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source.map(str::to_string));
        Ok(text.to_uppercase())
    }
}

struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn translate(
        &self,
        _text: &str,
        _source: Option<&str>,
        _target: &str,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Quota("daily limit reached".to_string()))
    }
}

/// Records what it was asked to summarise.
#[derive(Default)]
struct StubSummarizer {
    seen: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn summarize(&self, text: &str, target_lang: &str) -> Result<String, SummaryError> {
        self.seen
            .lock()
            .unwrap()
            .push((text.to_string(), target_lang.to_string()));
        Ok(format!("A letter of {} words.\n", text.split_whitespace().count()))
    }
}

struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn summarize(&self, _text: &str, _target_lang: &str) -> Result<String, SummaryError> {
        Err(SummaryError::Auth("invalid api key".to_string()))
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────────

/// Route library logs through the test harness; `RUST_LOG=scanlate=debug`
/// shows them with `--nocapture`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        let root = tempfile::tempdir().unwrap();
        for dir in ["inbox", "tmp"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        Self { root }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Write `inbox/<name>.pdf` with one line per page script.
    fn pdf(&self, name: &str, pages: &[&str]) -> PathBuf {
        let path = self.path(&format!("inbox/{name}.pdf"));
        let mut content = String::from("%PDF-1.4");
        for script in pages {
            content.push('\n');
            content.push_str(script);
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn builder(
        &self,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrEngine>,
    ) -> PipelineConfigBuilder {
        PipelineConfig::builder(rasterizer, ocr)
            .work_dir(self.path("work"))
            .out_dir(self.path("out"))
            .temp_root(self.path("tmp"))
            .retry_backoff_ms(1)
            .per_page_timeout(Duration::from_secs(5))
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).unwrap()
    }

    fn assert_no_temp_dirs(&self) {
        let left: Vec<_> = std::fs::read_dir(self.path("tmp")).unwrap().collect();
        assert!(left.is_empty(), "temporary directories left behind: {left:?}");
    }
}

// ── Single document ──────────────────────────────────────────────────────────

#[tokio::test]
async fn all_pages_ok_without_translator_is_success() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_01", &["alpha", "beta", "gamma"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Success);
    assert_eq!(result.document_id, "brief_01");
    assert_eq!(result.page_count, 3);
    assert_eq!(result.ocr_pages_ok, 3);
    assert!(result.page_errors.is_empty());
    assert!(result.translated_text_path.is_none());
    assert_eq!(result.merged_text_path, Some(fx.path("work/brief_01.ocr.txt")));
    assert_eq!(fx.read("work/brief_01.ocr.txt"), "alpha\n\nbeta\n\ngamma");
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn one_failed_page_is_partial_and_keeps_its_slot() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_02", &["alpha", "fail", "gamma"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Partial);
    assert_eq!(result.ocr_pages_ok, 2);
    assert_eq!(result.page_errors.len(), 1);
    assert_eq!(result.page_errors[0].page, 2);
    assert_eq!(result.page_errors[0].attempts, 1, "permanent errors are not retried");

    let merged = fx.read("work/brief_02.ocr.txt");
    let blocks: Vec<&str> = merged.split("\n\n").collect();
    assert_eq!(blocks, vec!["alpha", "", "gamma"]);
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn rasterization_failure_skips_ocr_and_translation() {
    let fx = Fixture::new();
    let pdf = fx.pdf("broken", &["alpha"]);
    let ocr = Arc::new(StubOcr::default());
    let translator = Arc::new(StubTranslator::default());
    let config = fx
        .builder(Arc::new(FailingRasterizer), ocr.clone())
        .translator(translator.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Failure);
    assert!(matches!(
        result.error,
        Some(DocumentError::Rasterization(RasterizationError::Unreadable { .. }))
    ));
    assert!(result.page_errors.is_empty());
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert!(!fx.path("work/broken.ocr.txt").exists());
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn empty_rasterization_is_a_failure() {
    let fx = Fixture::new();
    let pdf = fx.pdf("blank", &[]);
    let ocr = Arc::new(StubOcr::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), ocr.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Failure);
    assert!(matches!(
        result.error,
        Some(DocumentError::Rasterization(RasterizationError::NoPages { .. }))
    ));
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn all_pages_failed_writes_nothing() {
    let fx = Fixture::new();
    let pdf = fx.pdf("smudged", &["fail", "fail"]);
    let translator = Arc::new(StubTranslator::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(translator.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Failure);
    assert_eq!(result.error, Some(DocumentError::AllPagesFailed { total: 2 }));
    assert_eq!(result.page_errors.len(), 2);
    assert!(result.merged_text_path.is_none());
    assert!(!fx.path("work/smudged.ocr.txt").exists());
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn non_pdf_input_is_rejected_before_rasterizing() {
    let fx = Fixture::new();
    let path = fx.path("inbox/photo.pdf");
    std::fs::write(&path, b"\xFF\xD8\xFF\xE0 not a pdf").unwrap();
    let rasterizer = Arc::new(StubRasterizer::default());
    let config = fx
        .builder(rasterizer.clone(), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let pipeline = DocumentPipeline::new(config);
    let bad = pipeline.process(&path).await;
    let missing = pipeline.process(fx.path("inbox/missing.pdf")).await;

    assert!(matches!(bad.error, Some(DocumentError::InvalidInput { .. })));
    assert!(matches!(missing.error, Some(DocumentError::InvalidInput { .. })));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn translation_is_written_per_target_language() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_03", &["liebe oma", "viele grüße"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(Arc::new(StubTranslator::default()))
        .target_lang("de")
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Success);
    assert_eq!(result.translated_text_path, Some(fx.path("out/de/brief_03.txt")));
    assert_eq!(fx.read("out/de/brief_03.txt"), "LIEBE OMA\n\nVIELE GRÜSSE");
    assert_eq!(fx.read("work/brief_03.ocr.txt"), "liebe oma\n\nviele grüße");
}

#[tokio::test]
async fn translation_failure_is_partial_and_keeps_ocr_text() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_04", &["alpha", "beta"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(Arc::new(FailingTranslator))
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Partial);
    assert!(result.page_errors.is_empty());
    assert!(matches!(result.translation_error, Some(TranslationError::Quota(_))));
    assert_eq!(fx.read("work/brief_04.ocr.txt"), "alpha\n\nbeta");
    assert!(result.translated_text_path.is_none());
    assert!(!fx.path("out/en/brief_04.txt").exists());
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_05", &["eins@20", "zwei", "fail", "vier@5"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .concurrency_limit(4)
        .build()
        .unwrap();
    let pipeline = DocumentPipeline::new(config);

    pipeline.process(&pdf).await;
    let first = std::fs::read(fx.path("work/brief_05.ocr.txt")).unwrap();
    pipeline.process(&pdf).await;
    let second = std::fs::read(fx.path("work/brief_05.ocr.txt")).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn page_order_survives_out_of_order_completion() {
    let fx = Fixture::new();
    // Later pages finish first.
    let pdf = fx.pdf("brief_06", &["one@80", "two@40", "three@0"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .concurrency_limit(3)
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Success);
    assert_eq!(fx.read("work/brief_06.ocr.txt"), "one\n\ntwo\n\nthree");
}

#[tokio::test]
async fn panicking_adapter_becomes_failure_and_cleans_up() {
    let fx = Fixture::new();
    let pdf = fx.pdf("cursed", &["alpha", "panic"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Failure);
    match result.error {
        Some(DocumentError::Unexpected { ref detail }) => {
            assert!(detail.contains("exploded"), "{detail}")
        }
        ref other => panic!("expected Unexpected, got {other:?}"),
    }
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn slow_page_times_out_without_failing_the_document() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_07", &["quick", "stuck@5000"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .per_page_timeout(Duration::from_millis(100))
        .max_retries(0)
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Partial);
    assert!(matches!(result.page_errors[0].error, OcrError::Timeout { .. }));
    assert_eq!(fx.read("work/brief_07.ocr.txt"), "quick\n\n");
}

#[tokio::test]
async fn exhausted_transient_retries_stay_a_page_failure() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_08", &["alpha", "flaky", "gamma"]);
    let ocr = Arc::new(StubOcr::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), ocr.clone())
        .retry_backoff_ms(0)
        .max_retries(80)
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Partial, "{:?}", result.error);
    assert_eq!(result.page_errors.len(), 1);
    assert_eq!(result.page_errors[0].page, 2);
    assert_eq!(result.page_errors[0].attempts, 81);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 83);
    assert_eq!(fx.read("work/brief_08.ocr.txt"), "alpha\n\n\n\ngamma");
}

#[tokio::test]
async fn blank_ocr_text_skips_translation() {
    let fx = Fixture::new();
    let pdf = fx.pdf("empty_scan", &["   ", "\t"]);
    let translator = Arc::new(StubTranslator::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(translator.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Partial);
    assert_eq!(result.ocr_pages_ok, 2);
    assert!(result.page_errors.is_empty());
    assert_eq!(result.translation_error, None);
    assert!(result.translated_text_path.is_none());
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert!(!fx.path("out").exists());
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn explicit_source_language_reaches_the_translator() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_09", &["liebe grüße"]);
    let translator = Arc::new(StubTranslator::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(translator.clone())
        .source_lang("de")
        .target_lang("en")
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Success);
    assert_eq!(*translator.sources.lock().unwrap(), vec![Some("de".to_string())]);
    assert_eq!(fx.read("out/en/brief_09.txt"), "LIEBE GRÜSSE");
}

#[tokio::test]
async fn source_language_defaults_to_detection() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_10", &["bonjour"]);
    let translator = Arc::new(StubTranslator::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(translator.clone())
        .build()
        .unwrap();

    DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(*translator.sources.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn summary_follows_the_translation() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_11", &["liebe anna", "dein karl"]);
    let summarizer = Arc::new(StubSummarizer::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(Arc::new(StubTranslator::default()))
        .summarizer(summarizer.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Success);
    assert_eq!(result.summary_path, Some(fx.path("out/en/brief_11.summary.txt")));
    assert_eq!(result.summary_error, None);
    assert_eq!(fx.read("out/en/brief_11.summary.txt"), "A letter of 4 words.");
    let seen = summarizer.seen.lock().unwrap();
    assert_eq!(*seen, vec![("LIEBE ANNA\n\nDEIN KARL".to_string(), "en".to_string())]);
}

#[tokio::test]
async fn summary_without_translator_reads_the_ocr_text() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_12", &["liebe anna", "fail"]);
    let summarizer = Arc::new(StubSummarizer::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .summarizer(summarizer.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Partial);
    assert!(result.summary_path.is_some());
    assert_eq!(summarizer.seen.lock().unwrap()[0].0, "liebe anna\n\n");
}

#[tokio::test]
async fn summary_failure_does_not_change_status() {
    let fx = Fixture::new();
    let pdf = fx.pdf("brief_13", &["alpha"]);
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .translator(Arc::new(StubTranslator::default()))
        .summarizer(Arc::new(FailingSummarizer))
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert_eq!(result.status, DocumentStatus::Success);
    assert!(result.summary_path.is_none());
    assert!(matches!(result.summary_error, Some(SummaryError::Auth(_))));
    assert!(!fx.path("out/en/brief_13.summary.txt").exists());
    assert_eq!(fx.read("out/en/brief_13.txt"), "ALPHA");
}

#[tokio::test]
async fn blank_document_is_not_summarised() {
    let fx = Fixture::new();
    let pdf = fx.pdf("empty_scan_2", &["  "]);
    let summarizer = Arc::new(StubSummarizer::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .summarizer(summarizer.clone())
        .build()
        .unwrap();

    let result = DocumentPipeline::new(config).process(&pdf).await;

    assert!(result.summary_path.is_none());
    assert!(result.summary_error.is_none());
    assert!(summarizer.seen.lock().unwrap().is_empty());
}

// ── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_reports_one_result_per_input_in_order() {
    let fx = Fixture::new();
    let paths = vec![
        fx.pdf("a", &["alpha"]),
        fx.path("inbox/missing.pdf"),
        fx.pdf("c", &["fail", "gamma"]),
        fx.pdf("d", &["fail"]),
        fx.pdf("e", &["epsilon"]),
    ];
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let report = BatchRunner::new(config).run_batch(&paths).await;

    let ids: Vec<&str> = report.results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "missing", "c", "d", "e"]);
    let statuses: Vec<DocumentStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            DocumentStatus::Success,
            DocumentStatus::Failure,
            DocumentStatus::Partial,
            DocumentStatus::Failure,
            DocumentStatus::Success,
        ]
    );
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.partial, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.processed, 5);
    fx.assert_no_temp_dirs();
}

#[tokio::test]
async fn concurrent_documents_keep_input_order() {
    let fx = Fixture::new();
    let paths = vec![
        fx.pdf("slow", &["s@120"]),
        fx.pdf("medium", &["m@60"]),
        fx.pdf("fast", &["f"]),
    ];
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .document_concurrency(3)
        .build()
        .unwrap();

    let report = BatchRunner::new(config).run_batch(&paths).await;

    let ids: Vec<&str> = report.results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "medium", "fast"]);
    assert!(report.results.iter().all(|r| r.is_success()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_documents_sharing_a_stem_both_write() {
    let fx = Fixture::new();
    let first = fx.pdf("twin", &["from inbox@20"]);
    std::fs::create_dir_all(fx.path("inbox2")).unwrap();
    let second = fx.path("inbox2/twin.pdf");
    std::fs::write(&second, "%PDF-1.4\nfrom inbox2@20").unwrap();
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .document_concurrency(2)
        .build()
        .unwrap();

    let report = BatchRunner::new(config).run_batch([&first, &second]).await;

    assert!(report.results.iter().all(|r| r.is_success()), "{:?}", report.results);
    let merged = fx.read("work/twin.ocr.txt");
    assert!(merged == "from inbox" || merged == "from inbox2", "{merged}");
    let left: Vec<_> = std::fs::read_dir(fx.path("work")).unwrap().collect();
    assert_eq!(left.len(), 1, "{left:?}");
}

#[tokio::test]
async fn empty_batch_touches_no_adapter() {
    let fx = Fixture::new();
    let rasterizer = Arc::new(StubRasterizer::default());
    let config = fx
        .builder(rasterizer.clone(), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let report = BatchRunner::new(config).run_batch(Vec::<PathBuf>::new()).await;

    assert!(report.is_empty());
    assert!(report.all_usable());
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

/// Cancels the batch as soon as the first document completes.
#[derive(Default)]
struct CancelAfterFirst {
    handle: Mutex<Option<CancelHandle>>,
    started: AtomicUsize,
    completed: AtomicUsize,
    batch_total: AtomicUsize,
}

impl BatchProgressCallback for CancelAfterFirst {
    fn on_batch_start(&self, total_documents: usize) {
        self.batch_total.store(total_documents, Ordering::SeqCst);
    }

    fn on_document_start(&self, _index: usize, _total: usize, _document_id: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_complete(&self, index: usize, _total: usize, _result: &PipelineResult) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if index == 0 {
            if let Some(ref h) = *self.handle.lock().unwrap() {
                h.cancel();
            }
        }
    }
}

#[tokio::test]
async fn cancellation_fills_remaining_results() {
    let fx = Fixture::new();
    let paths = vec![
        fx.pdf("a", &["alpha"]),
        fx.pdf("b", &["beta"]),
        fx.pdf("c", &["gamma"]),
    ];
    let ocr = Arc::new(StubOcr::default());
    let cb = Arc::new(CancelAfterFirst::default());
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), ocr.clone())
        .document_concurrency(1)
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let runner = BatchRunner::new(config);
    *cb.handle.lock().unwrap() = Some(runner.cancel_handle());

    let report = runner.run_batch(&paths).await;

    assert_eq!(report.len(), 3);
    assert!(report.results[0].is_success());
    for r in &report.results[1..] {
        assert_eq!(r.status, DocumentStatus::Failure);
        assert_eq!(r.error, Some(DocumentError::Cancelled));
    }
    assert_eq!(report.cancelled, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cb.batch_total.load(Ordering::SeqCst), 3);
    assert_eq!(cb.started.load(Ordering::SeqCst), 1);
    assert_eq!(cb.completed.load(Ordering::SeqCst), 3);
}

#[test]
fn blocking_batch_runs_outside_a_runtime() {
    let fx = Fixture::new();
    let paths = vec![fx.pdf("a", &["alpha", "beta"])];
    let config = fx
        .builder(Arc::new(StubRasterizer::default()), Arc::new(StubOcr::default()))
        .build()
        .unwrap();

    let report = BatchRunner::new(config).run_batch_blocking(&paths).unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(fx.read("work/a.ocr.txt"), "alpha\n\nbeta");
}
