//! Translation through the Cloud Translation v2 REST endpoint.
//!
//! Sends `format: "text"` but still receives HTML-escaped output in
//! practice, so the pipeline decodes entities afterwards
//! (see [`crate::postprocess::decode_html_entities`]).

use super::google_vision::api_error_message;
use super::{classify_status, Translator};
use crate::error::TranslationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_TRANSLATE_ENDPOINT: &str =
    "https://translation.googleapis.com/language/translate/v2";

#[derive(Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslator")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GoogleTranslator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_TRANSLATE_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google-translate"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let body = TranslateRequest {
            q: text,
            target: target_lang,
            source: source_lang,
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        if !status.is_success() {
            let detail = api_error_message(&text).unwrap_or_else(|| format!("HTTP {status}"));
            return Err(classify_status(status.as_u16()).translation(detail));
        }

        let (translated, detected) = parse_translate_response(&text)?;
        if let Some(lang) = detected {
            debug!("Detected source language: {}", lang);
        }
        Ok(translated)
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
    detected_source_language: Option<String>,
}

/// Returns `(translated_text, detected_source_language)`.
fn parse_translate_response(body: &str) -> Result<(String, Option<String>), TranslationError> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;
    let first = parsed.data.translations.into_iter().next().ok_or_else(|| {
        TranslationError::MalformedResponse("empty `translations` array".to_string())
    })?;
    Ok((first.translated_text, first.detected_source_language))
}
