//! Translation step: chunking, per-call timeout, entity decoding.

use crate::adapters::Translator;
use crate::config::PipelineConfig;
use crate::error::TranslationError;
use crate::postprocess::decode_html_entities;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

const PARAGRAPH_BREAK: &str = "\n\n";

/// Translate `text` chunk by chunk, in order, and re-join the pieces with a
/// blank line.
pub async fn translate_text(
    translator: &Arc<dyn Translator>,
    text: &str,
    config: &PipelineConfig,
) -> Result<String, TranslationError> {
    let chunks = split_into_chunks(text, config.translation_chunk_chars);
    debug!(
        "Translating {} chars in {} chunk(s) with {}",
        text.len(),
        chunks.len(),
        translator.name()
    );

    let mut translated = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        // A failed page's empty slot can end up alone in a chunk; services
        // reject empty input, and there is nothing to translate anyway.
        if chunk.trim().is_empty() {
            translated.push(chunk.clone());
            continue;
        }
        let call = translator.translate(chunk, config.source_lang.as_deref(), &config.target_lang);
        let piece = timeout(config.translation_timeout, call)
            .await
            .map_err(|_| TranslationError::Timeout {
                secs: config.translation_timeout.as_secs(),
            })??;
        translated.push(decode_html_entities(&piece));
    }
    Ok(translated.join(PARAGRAPH_BREAK))
}

/// Greedy packer: appends pieces separated by `sep` while the chunk stays
/// within `max` characters.
struct Packer<'a> {
    sep: &'a str,
    max: usize,
    current: String,
    current_len: usize,
    has_piece: bool,
    out: Vec<String>,
}

impl<'a> Packer<'a> {
    fn new(sep: &'a str, max: usize) -> Self {
        Self {
            sep,
            max,
            current: String::new(),
            current_len: 0,
            has_piece: false,
            out: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if self.has_piece {
            self.out.push(std::mem::take(&mut self.current));
            self.current_len = 0;
            self.has_piece = false;
        }
    }

    /// `piece` must already fit in `max`.
    fn push(&mut self, piece: &str, piece_len: usize) {
        let sep_len = self.sep.chars().count();
        if self.has_piece && self.current_len + sep_len + piece_len > self.max {
            self.flush();
        }
        if self.has_piece {
            self.current.push_str(self.sep);
            self.current_len += sep_len;
        }
        self.current.push_str(piece);
        self.current_len += piece_len;
        self.has_piece = true;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.out
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Chunks break at paragraph boundaries when possible, then at line
/// boundaries, and only split inside a line when a single line is longer
/// than `max_chars`. Joining the chunks with `"\n\n"` restores the original
/// whenever no paragraph had to be split.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut packer = Packer::new(PARAGRAPH_BREAK, max_chars);
    for paragraph in text.split(PARAGRAPH_BREAK) {
        let len = paragraph.chars().count();
        if len <= max_chars {
            packer.push(paragraph, len);
        } else {
            packer.flush();
            packer.out.extend(split_long_paragraph(paragraph, max_chars));
        }
    }
    packer.finish()
}

/// Split one oversized paragraph at line breaks, hard-splitting lines that
/// are still too long.
fn split_long_paragraph(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut packer = Packer::new("\n", max_chars);
    for line in paragraph.split('\n') {
        let len = line.chars().count();
        if len <= max_chars {
            packer.push(line, len);
        } else {
            packer.flush();
            let chars: Vec<char> = line.chars().collect();
            packer
                .out
                .extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
        }
    }
    packer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{OcrEngine, Rasterizer};
    use crate::error::{OcrError, RasterizationError};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Unused;

    #[async_trait]
    impl Rasterizer for Unused {
        fn name(&self) -> &str {
            "unused"
        }
        async fn rasterize(
            &self,
            _: &Path,
            _: u32,
            _: &Path,
        ) -> Result<Vec<PathBuf>, RasterizationError> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl OcrEngine for Unused {
        fn name(&self) -> &str {
            "unused"
        }
        async fn recognize(&self, _: &Path) -> Result<String, OcrError> {
            Ok(String::new())
        }
    }

    /// Upper-cases its input and records every chunk it was given. Rejects
    /// blank input the way Cloud Translation does.
    #[derive(Default)]
    struct Upper {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Translator for Upper {
        fn name(&self) -> &str {
            "upper"
        }
        async fn translate(
            &self,
            text: &str,
            _: Option<&str>,
            _: &str,
        ) -> Result<String, TranslationError> {
            if text.trim().is_empty() {
                return Err(TranslationError::Api("empty q".into()));
            }
            self.seen.lock().unwrap().push(text.to_string());
            Ok(text.to_uppercase())
        }
    }

    struct Hanging;

    #[async_trait]
    impl Translator for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }
        async fn translate(
            &self,
            _: &str,
            _: Option<&str>,
            _: &str,
        ) -> Result<String, TranslationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    struct Escaping;

    #[async_trait]
    impl Translator for Escaping {
        fn name(&self) -> &str {
            "escaping"
        }
        async fn translate(
            &self,
            _: &str,
            _: Option<&str>,
            _: &str,
        ) -> Result<String, TranslationError> {
            Ok("Tom &amp; Jerry&#39;s &quot;show&quot;".to_string())
        }
    }

    fn config(chunk_chars: usize) -> PipelineConfig {
        PipelineConfig::builder(Arc::new(Unused), Arc::new(Unused))
            .translation_chunk_chars(chunk_chars)
            .translation_timeout(Duration::from_millis(50))
            .build()
            .unwrap()
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_into_chunks("hello\n\nworld", 100), vec!["hello\n\nworld"]);
        assert_eq!(split_into_chunks("", 100), vec![""]);
    }

    #[test]
    fn chunks_break_at_paragraphs_and_rejoin_exactly() {
        let text = "aaaa\n\nbbbb\n\n\n\ncccc\n\ndddd";
        let chunks = split_into_chunks(text, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10), "{chunks:?}");
        assert_eq!(chunks.join("\n\n"), text);
    }

    #[test]
    fn oversized_line_is_hard_split_on_char_boundaries() {
        let text = "ééééééééé\n\nok";
        let chunks = split_into_chunks(text, 4);
        assert_eq!(chunks, vec!["éééé", "éééé", "é", "ok"]);
    }

    #[tokio::test]
    async fn translates_chunks_in_order() {
        let upper = Arc::new(Upper::default());
        let translator: Arc<dyn Translator> = upper.clone();
        let (a, b, c) = ("a".repeat(60), "b".repeat(60), "c".repeat(10));
        let text = format!("{a}\n\n{b}\n\n{c}");
        let out = translate_text(&translator, &text, &config(100)).await.unwrap();
        assert_eq!(out, text.to_uppercase());
        assert_eq!(*upper.seen.lock().unwrap(), vec![a, format!("{b}\n\n{c}")]);
    }

    #[tokio::test]
    async fn blank_chunk_keeps_its_slot_without_a_call() {
        let upper = Arc::new(Upper::default());
        let translator: Arc<dyn Translator> = upper.clone();
        let (a, b) = ("a".repeat(4999), "b".repeat(4999));
        let text = format!("{a}\n\n\n\n{b}");
        assert_eq!(split_into_chunks(&text, 5000), vec![a.clone(), String::new(), b.clone()]);

        let out = translate_text(&translator, &text, &config(5000)).await.unwrap();
        assert_eq!(out, text.to_uppercase());
        assert_eq!(*upper.seen.lock().unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn decodes_entities_in_translations() {
        let translator: Arc<dyn Translator> = Arc::new(Escaping);
        let out = translate_text(&translator, "x", &config(5000)).await.unwrap();
        assert_eq!(out, "Tom & Jerry's \"show\"");
    }

    #[tokio::test]
    async fn slow_translation_times_out() {
        let translator: Arc<dyn Translator> = Arc::new(Hanging);
        let err = translate_text(&translator, "x", &config(5000)).await.unwrap_err();
        assert!(matches!(err, TranslationError::Timeout { .. }));
    }
}
