//! LLM-backed OCR, translation and summaries via `edgequake-llm`.
//!
//! The adapters are thin: one chat call per page, per text chunk or per
//! document. Retries and timeouts live in the pipeline so every backend gets
//! the same policy.

use super::encode::encode_image_file;
use super::{classify_message, OcrEngine, Summarizer, Translator};
use crate::error::{OcrError, ScanlateError, SummaryError, TranslationError};
use crate::prompts::{summary_system_prompt, translation_system_prompt, OCR_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Model used when a provider is named without a model.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Resolve a provider: named provider + model, or auto-detection from the
/// environment (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …).
pub fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, ScanlateError> {
    if let Some(name) = provider_name {
        let model = model.unwrap_or(DEFAULT_VISION_MODEL);
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            ScanlateError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        });
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ScanlateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;
    Ok(provider)
}

/// OCR a page by asking a vision LLM to transcribe it.
#[derive(Clone)]
pub struct LlmVisionOcr {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
}

impl LlmVisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            system_prompt: OCR_SYSTEM_PROMPT.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl OcrEngine for LlmVisionOcr {
    fn name(&self) -> &str {
        "llm-vision"
    }

    async fn recognize(&self, image: &std::path::Path) -> Result<String, OcrError> {
        let encoded = encode_image_file(image).await?;

        // The image carries all the content; the user text stays empty.
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images("", vec![encoded.into_image_data()]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| {
                let msg = e.to_string();
                classify_message(&msg).ocr(msg)
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            image.display(),
            response.prompt_tokens,
            response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Translate with a chat LLM.
#[derive(Clone)]
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            temperature: 0.2,
            max_tokens: 8192,
        }
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let messages = vec![
            ChatMessage::system(translation_system_prompt(source_lang, target_lang)),
            ChatMessage::user(text),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                let msg = e.to_string();
                classify_message(&msg).translation(msg)
            })?;
        Ok(response.content)
    }
}

/// Characters of document text sent for a summary. Letters state who writes
/// to whom up front, so the opening is enough.
pub const DEFAULT_SUMMARY_INPUT_CHARS: usize = 3000;

/// Summarise a document with a chat LLM.
#[derive(Clone)]
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    max_input_chars: usize,
    max_tokens: usize,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            max_input_chars: DEFAULT_SUMMARY_INPUT_CHARS,
            max_tokens: 400,
        }
    }

    pub fn with_max_input_chars(mut self, n: usize) -> Self {
        self.max_input_chars = n.max(1);
        self
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn summarize(&self, text: &str, target_lang: &str) -> Result<String, SummaryError> {
        let messages = vec![
            ChatMessage::system(summary_system_prompt(target_lang)),
            ChatMessage::user(excerpt(text, self.max_input_chars)),
        ];
        let options = CompletionOptions {
            temperature: Some(0.3),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                let msg = e.to_string();
                classify_message(&msg).summary(msg)
            })?;
        Ok(response.content.trim().to_string())
    }
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
