//! OCR through the Cloud Vision `images:annotate` REST endpoint.
//!
//! One request per page with a `DOCUMENT_TEXT_DETECTION` feature; the page
//! text is `responses[0].fullTextAnnotation.text`. A page with no detectable
//! text comes back without `fullTextAnnotation` and is recognised as empty.
//! Errors for a single image are reported in-band as `responses[0].error`
//! with HTTP 200.

use super::encode::encode_image_file;
use super::{classify_status, OcrEngine};
use crate::error::{OcrError, ScanlateError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Cloud Vision client authenticated with an API key.
#[derive(Clone)]
pub struct GoogleVisionOcr {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language_hints: Vec<String>,
}

impl std::fmt::Debug for GoogleVisionOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleVisionOcr")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("language_hints", &self.language_hints)
            .finish()
    }
}

impl GoogleVisionOcr {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: api_key.into(),
            language_hints: Vec::new(),
        }
    }

    /// Override the endpoint (regional endpoints, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// BCP-47 hints such as `"de"`; help with handwriting and old typefaces.
    pub fn with_language_hints(mut self, hints: Vec<String>) -> Self {
        self.language_hints = hints;
        self
    }

    /// Transport-level timeout. The pipeline applies its own per-page
    /// timeout on top of this.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Result<Self, ScanlateError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanlateError::ProviderNotConfigured {
                provider: "google-vision".to_string(),
                hint: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(self)
    }

    fn request_body(&self, content: String) -> AnnotateRequest {
        AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent { content },
                features: vec![Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
                image_context: if self.language_hints.is_empty() {
                    None
                } else {
                    Some(ImageContext {
                        language_hints: self.language_hints.clone(),
                    })
                },
            }],
        }
    }
}

#[async_trait]
impl OcrEngine for GoogleVisionOcr {
    fn name(&self) -> &str {
        "google-vision"
    }

    async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let encoded = encode_image_file(image).await?;
        let body = self.request_body(encoded.base64);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::Network(format!("request timed out: {e}"))
                } else {
                    OcrError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;

        if !status.is_success() {
            let detail = api_error_message(&text).unwrap_or_else(|| format!("HTTP {status}"));
            return Err(classify_status(status.as_u16()).ocr(detail));
        }

        let text = parse_annotate_response(&text)?;
        debug!("{}: {} chars recognised", image.display(), text.len());
        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// Extract the page text from a successful (HTTP 200) response body.
fn parse_annotate_response(body: &str) -> Result<String, OcrError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| OcrError::MalformedResponse(e.to_string()))?;
    let first = parsed
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::MalformedResponse("empty `responses` array".to_string()))?;

    if let Some(err) = first.error {
        return Err(OcrError::Api(format!("code {}: {}", err.code, err.message)));
    }
    Ok(first
        .full_text_annotation
        .map(|a| a.text)
        .unwrap_or_default())
}

/// `{"error": {"message": …}}` bodies returned with non-2xx statuses.
pub(crate) fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
}
