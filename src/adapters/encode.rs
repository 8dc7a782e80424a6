//! Page-image encoding: image file on disk → base64 payload for remote APIs.
//!
//! Both Cloud Vision and the vision-LLM providers take the image inline as
//! base64 in the JSON request body, so the bytes are never uploaded
//! separately.

use crate::error::OcrError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// A page image ready to embed in a request body.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub base64: String,
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// Convert to the LLM crate's attachment type.
    ///
    /// `detail: "high"` keeps small print legible for tiled vision models.
    pub fn into_image_data(self) -> ImageData {
        ImageData::new(self.base64, self.mime_type).with_detail("high")
    }
}

/// Read `path` and base64-encode it, inferring the MIME type from the
/// extension (PNG when unknown, which is what both rasterizers emit).
pub async fn encode_image_file(path: &Path) -> Result<EncodedImage, OcrError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| OcrError::Io(format!("{}: {e}", path.display())))?;
    let mime_type = ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png");
    let base64 = STANDARD.encode(&bytes);
    debug!("Encoded {} → {} bytes base64", path.display(), base64.len());
    Ok(EncodedImage { base64, mime_type })
}
