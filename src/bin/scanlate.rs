//! CLI binary for scanlate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the batch and prints the report.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scanlate::adapters::{
    llm::resolve_provider, GoogleTranslator, GoogleVisionOcr, LlmSummarizer, LlmTranslator,
    LlmVisionOcr, OcrEngine, PdfiumRasterizer, PdftoppmRasterizer, Rasterizer, Translator,
};
use scanlate::{
    discover_documents, BatchProgressCallback, BatchReport, BatchRunner, DocumentStatus,
    PipelineConfig, PipelineResult, ProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn status_mark(status: DocumentStatus) -> String {
    match status {
        DocumentStatus::Success => green("✓"),
        DocumentStatus::Partial => yellow("⚠"),
        DocumentStatus::Failure => red("✗"),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar counting documents, with the current
/// document's page progress as the message.
struct CliProgressCallback {
    bar: ProgressBar,
    /// document id → (pages done, pages total)
    pages: Mutex<HashMap<String, (usize, usize)>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            pages: Mutex::new(HashMap::new()),
        })
    }

    fn page_tick(&self, document_id: &str, total_pages: usize) {
        let Ok(mut pages) = self.pages.lock() else {
            return;
        };
        let entry = pages.entry(document_id.to_string()).or_insert((0, total_pages));
        entry.0 += 1;
        self.bar
            .set_message(format!("{document_id}: page {}/{}", entry.0, entry.1));
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, document_id: &str) {
        self.bar.set_message(format!("{document_id}: rasterizing"));
    }

    fn on_pages_ready(&self, document_id: &str, page_count: usize) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(document_id.to_string(), (0, page_count));
        }
        self.bar
            .set_message(format!("{document_id}: page 0/{page_count}"));
    }

    fn on_page_complete(
        &self,
        document_id: &str,
        _page: usize,
        total_pages: usize,
        _text_len: usize,
    ) {
        self.page_tick(document_id, total_pages);
    }

    fn on_page_error(&self, document_id: &str, page: usize, total_pages: usize, error: &str) {
        self.page_tick(document_id, total_pages);
        let msg = truncate(error, 80);
        self.bar.println(format!(
            "  {} {} page {}: {}",
            red("✗"),
            document_id,
            page,
            red(&msg)
        ));
    }

    fn on_document_complete(&self, index: usize, total: usize, result: &PipelineResult) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.remove(&result.document_id);
        }
        self.bar.println(format!(
            "  {} [{:>3}/{:<3}] {:<32} {}",
            status_mark(result.status),
            index + 1,
            total,
            result.document_id,
            dim(&format!(
                "{}/{} pages  {:.1}s",
                result.ocr_pages_ok,
                result.page_count,
                result.duration_ms as f64 / 1000.0
            )),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _report: &BatchReport) {
        self.bar.finish_and_clear();
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR and translate every PDF in a folder (Google Vision + Translate)
  scanlate letters/inbox

  # Only OCR, no translation
  scanlate --no-translate scan_001.pdf scan_002.pdf

  # Translate German letters into English
  scanlate --source-lang de --target-lang en letters/inbox

  # Use a vision LLM for OCR and translation instead of Google
  scanlate --ocr llm --translator llm --provider openai --model gpt-4.1-mini letters/inbox

  # In-process rasterizer (needs libpdfium)
  PDFIUM_LIB_PATH=/opt/pdfium/lib/libpdfium.so scanlate --rasterizer pdfium letters/inbox

  # Also write a short LLM summary of each letter
  scanlate --summarize --provider openai letters/inbox

  # Check prerequisites
  scanlate --check

OUTPUT LAYOUT:
  <work-dir>/<stem>.ocr.txt            merged OCR text, one blank line between pages
  <out-dir>/<target-lang>/<stem>.txt   translation
  <out-dir>/<target-lang>/<stem>.summary.txt   summary (--summarize)

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          API key for Cloud Vision and Cloud Translation
  OPENAI_API_KEY          OpenAI API key (--ocr llm / --translator llm)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  PDFIUM_LIB_PATH         Path to libpdfium for --rasterizer pdfium
  RUST_LOG                Override the log filter (e.g. scanlate=debug)

EXIT STATUS:
  0  every document produced usable output (success or partial)
  1  at least one document failed, or the run could not start
"#;

/// Rasterize, OCR and translate scanned PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "scanlate",
    version,
    about = "Rasterize, OCR and translate scanned PDF documents",
    long_about = "Batch-digitise scanned PDFs: every page is rendered to an image, \
recognised with Google Cloud Vision or a vision LLM, merged into one text file per \
document, and optionally translated with Google Translate or an LLM.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files or directories containing PDFs.
    #[arg(required_unless_present = "check")]
    inputs: Vec<PathBuf>,

    /// Directory for merged OCR text.
    #[arg(long, env = "SCANLATE_WORK_DIR", default_value = "work")]
    work_dir: PathBuf,

    /// Directory for translations (a sub-directory per target language).
    #[arg(long, env = "SCANLATE_OUT_DIR", default_value = "out")]
    out_dir: PathBuf,

    /// Target language code (en, de, pt-BR, …).
    #[arg(long, env = "SCANLATE_TARGET_LANG", default_value = "en")]
    target_lang: String,

    /// Source language code. Auto-detected when omitted.
    #[arg(long, env = "SCANLATE_SOURCE_LANG")]
    source_lang: Option<String>,

    /// Stop after OCR; do not translate.
    #[arg(long, env = "SCANLATE_NO_TRANSLATE")]
    no_translate: bool,

    /// Write a short LLM summary of each document (needs an LLM provider).
    #[arg(long, env = "SCANLATE_SUMMARIZE")]
    summarize: bool,

    /// OCR backend.
    #[arg(long, env = "SCANLATE_OCR", value_enum, default_value = "google-vision")]
    ocr: OcrArg,

    /// Translation backend.
    #[arg(long, env = "SCANLATE_TRANSLATOR", value_enum, default_value = "google")]
    translator: TranslatorArg,

    /// Rasterization backend.
    #[arg(long, env = "SCANLATE_RASTERIZER", value_enum, default_value = "pdftoppm")]
    rasterizer: RasterizerArg,

    /// Rendering DPI (72–600).
    #[arg(long, env = "SCANLATE_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Concurrent OCR calls per document.
    #[arg(short, long, env = "SCANLATE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Documents processed at once.
    #[arg(long, env = "SCANLATE_DOCUMENTS", default_value_t = 1)]
    documents: usize,

    /// Per-page OCR timeout in seconds.
    #[arg(long, env = "SCANLATE_PAGE_TIMEOUT", default_value_t = 30)]
    page_timeout: u64,

    /// Retries per page on transient OCR failures (0–20).
    #[arg(long, env = "SCANLATE_MAX_RETRIES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(0..=20))]
    max_retries: u32,

    /// LLM model ID for --ocr llm, --translator llm and --summarize.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Google Cloud API key for Vision and Translate.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "SCANLATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCANLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Check prerequisites and exit.
    #[arg(long)]
    check: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCANLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCANLATE_QUIET")]
    quiet: bool,
}

impl Cli {
    fn translates_with(&self, translator: TranslatorArg) -> bool {
        !self.no_translate && self.translator == translator
    }

    fn needs_llm(&self) -> bool {
        self.ocr == OcrArg::Llm || self.translates_with(TranslatorArg::Llm) || self.summarize
    }

    fn needs_google(&self) -> bool {
        self.ocr == OcrArg::GoogleVision || self.translates_with(TranslatorArg::Google)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OcrArg {
    GoogleVision,
    Llm,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TranslatorArg {
    Google,
    Llm,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RasterizerArg {
    Pdftoppm,
    Pdfium,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear through the progress bar, so they are
    // only shown when the bar is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Check mode ───────────────────────────────────────────────────────
    if cli.check {
        let ok = run_check(&cli).await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    // ── Resolve inputs ───────────────────────────────────────────────────
    let documents = expand_inputs(&cli.inputs)?;
    if documents.is_empty() {
        if !cli.quiet {
            eprintln!("{} no PDF documents found", yellow("⚠"));
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let runner = BatchRunner::new(config);

    // ── Ctrl-C cancels documents that have not started yet ───────────────
    let cancel = runner.cancel_handle();
    let quiet = cli.quiet;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if !quiet {
                eprintln!(
                    "{} interrupted: finishing documents in progress, skipping the rest",
                    yellow("⚠")
                );
            }
            cancel.cancel();
        }
    });

    // ── Run batch ────────────────────────────────────────────────────────
    let report = runner.run_batch(&documents).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    if !report.all_usable() {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`, constructing the selected adapters.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let google_key = || -> Result<String> {
        match cli.api_key {
            Some(ref k) if !k.trim().is_empty() => Ok(k.clone()),
            _ => bail!("A Google API key is required: pass --api-key or set GOOGLE_API_KEY"),
        }
    };

    let rasterizer: Arc<dyn Rasterizer> = match cli.rasterizer {
        RasterizerArg::Pdftoppm => Arc::new(PdftoppmRasterizer::new()),
        RasterizerArg::Pdfium => Arc::new(PdfiumRasterizer::new()),
    };

    let llm = if cli.needs_llm() {
        let provider = resolve_provider(cli.provider.as_deref(), cli.model.as_deref())
            .context("LLM provider unavailable")?;
        Some(provider)
    } else {
        None
    };

    let ocr: Arc<dyn OcrEngine> = match (cli.ocr, &llm) {
        (OcrArg::GoogleVision, _) => {
            let mut engine = GoogleVisionOcr::new(google_key()?);
            if let Some(ref src) = cli.source_lang {
                engine = engine.with_language_hints(vec![src.clone()]);
            }
            Arc::new(engine)
        }
        (OcrArg::Llm, Some(provider)) => Arc::new(LlmVisionOcr::new(Arc::clone(provider))),
        (OcrArg::Llm, None) => bail!("LLM provider unavailable"),
    };

    let mut builder = PipelineConfig::builder(rasterizer, ocr)
        .dpi(cli.dpi)
        .concurrency_limit(cli.concurrency)
        .document_concurrency(cli.documents)
        .per_page_timeout(Duration::from_secs(cli.page_timeout))
        .max_retries(cli.max_retries)
        .work_dir(&cli.work_dir)
        .out_dir(&cli.out_dir)
        .target_lang(&cli.target_lang);

    if let Some(ref src) = cli.source_lang {
        builder = builder.source_lang(src);
    }

    if !cli.no_translate {
        let translator: Arc<dyn Translator> = match (cli.translator, &llm) {
            (TranslatorArg::Google, _) => Arc::new(GoogleTranslator::new(google_key()?)),
            (TranslatorArg::Llm, Some(provider)) => {
                Arc::new(LlmTranslator::new(Arc::clone(provider)))
            }
            (TranslatorArg::Llm, None) => bail!("LLM provider unavailable"),
        };
        builder = builder.translator(translator);
    }

    if cli.summarize {
        match &llm {
            Some(provider) => {
                builder = builder.summarizer(Arc::new(LlmSummarizer::new(Arc::clone(provider))));
            }
            None => bail!("LLM provider unavailable"),
        }
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Expand directories into the PDFs they contain; keep files as given.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = discover_documents(input)
                .with_context(|| format!("Failed to list {}", input.display()))?;
            documents.extend(found);
        } else {
            documents.push(input.clone());
        }
    }
    Ok(documents)
}

/// Print prerequisite status. Returns `true` when everything needed for the
/// selected backends is in place.
async fn run_check(cli: &Cli) -> bool {
    let mut ok = true;
    let mut report = |label: &str, passed: bool, detail: String| {
        ok &= passed;
        let mark = if passed { green("✓") } else { red("✗") };
        println!("  {mark} {label:<20} {}", dim(&detail));
    };

    println!("{}", bold("scanlate prerequisites"));

    let rasterizer: Box<dyn Rasterizer> = match cli.rasterizer {
        RasterizerArg::Pdftoppm => Box::new(PdftoppmRasterizer::new()),
        RasterizerArg::Pdfium => Box::new(PdfiumRasterizer::new()),
    };
    match rasterizer.check_available().await {
        Ok(()) => report("rasterizer", true, format!("{} available", rasterizer.name())),
        Err(e) => report("rasterizer", false, e.to_string()),
    }

    if cli.needs_google() {
        let has_key = cli.api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false);
        report(
            "google api key",
            has_key,
            if has_key { "set".to_string() } else { "missing: set GOOGLE_API_KEY".to_string() },
        );
    }

    if cli.needs_llm() {
        match resolve_provider(cli.provider.as_deref(), cli.model.as_deref()) {
            Ok(_) => {
                let name = cli.provider.as_deref().unwrap_or("auto-detected");
                report("llm provider", true, name.to_string())
            }
            Err(e) => {
                let first_line = e.to_string().lines().next().unwrap_or_default().to_string();
                report("llm provider", false, first_line)
            }
        }
    }

    let out_lang_dir = cli.out_dir.join(&cli.target_lang);
    let dirs = [
        ("work dir", cli.work_dir.as_path()),
        ("output dir", out_lang_dir.as_path()),
    ];
    for (label, dir) in dirs {
        match check_writable(dir).await {
            Ok(()) => report(label, true, dir.display().to_string()),
            Err(e) => report(label, false, format!("{}: {e}", dir.display())),
        }
    }

    ok
}

/// Create `dir` if needed and prove it accepts a file.
async fn check_writable(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let marker = dir.join(".scanlate-write-check");
    tokio::fs::write(&marker, b"ok").await?;
    tokio::fs::remove_file(&marker).await
}

fn print_summary(report: &BatchReport, progress_shown: bool) {
    if !progress_shown {
        for r in &report.results {
            eprintln!(
                "  {} {:<32} {}/{} pages  {}ms",
                status_mark(r.status),
                r.document_id,
                r.ocr_pages_ok,
                r.page_count,
                r.duration_ms
            );
        }
    }

    for r in report.results.iter().filter(|r| r.status != DocumentStatus::Success) {
        if let Some(ref e) = r.error {
            eprintln!("  {} {}: {}", red("✗"), r.document_id, e);
        }
        for pe in &r.page_errors {
            eprintln!("  {} {}: {}", yellow("⚠"), r.document_id, pe);
        }
        if let Some(ref e) = r.translation_error {
            eprintln!("  {} {}: translation: {}", yellow("⚠"), r.document_id, e);
        }
    }
    for r in &report.results {
        if let Some(ref e) = r.summary_error {
            eprintln!("  {} {}: summary: {}", yellow("⚠"), r.document_id, e);
        }
    }

    let headline = if report.failed == 0 && report.partial == 0 {
        green("✔")
    } else if report.failed == 0 {
        yellow("⚠")
    } else {
        red("✘")
    };
    eprintln!(
        "{} {} succeeded, {} partial, {} failed{}  {}",
        headline,
        bold(&report.succeeded.to_string()),
        report.partial,
        report.failed,
        if report.cancelled > 0 {
            format!(" ({} cancelled)", report.cancelled)
        } else {
            String::new()
        },
        dim(&format!("{:.1}s", report.total_duration_ms as f64 / 1000.0)),
    );
}
