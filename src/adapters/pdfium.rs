//! In-process rasterizer backed by `pdfium-render`.
//!
//! ## Why spawn_blocking?
//!
//! pdfium keeps thread-local state and renders synchronously, so all work runs
//! on Tokio's blocking pool instead of stalling the async workers.
//!
//! The pdfium shared library is bound at call time
//! (`PDFIUM_LIB_PATH`, then the system library); a missing library surfaces
//! as [`RasterizationError::ToolMissing`].

use super::Rasterizer;
use crate::error::RasterizationError;
use async_trait::async_trait;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders pages with pdfium at the requested DPI.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Optional cap on the longest rendered edge, in pixels.
    max_pixels: Option<u32>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap either rendered dimension, whatever the DPI. Guards against
    /// poster-sized pages exhausting memory.
    pub fn with_max_pixels(mut self, px: u32) -> Self {
        self.max_pixels = Some(px.max(100));
        self
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &str {
        "pdfium"
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizationError> {
        let pdf = pdf.to_path_buf();
        let out_dir = out_dir.to_path_buf();
        let max_pixels = self.max_pixels;

        tokio::task::spawn_blocking(move || render_blocking(&pdf, dpi, max_pixels, &out_dir))
            .await
            .map_err(|e| RasterizationError::Failed {
                detail: format!("render task panicked: {e}"),
            })?
    }

    async fn check_available(&self) -> Result<(), RasterizationError> {
        tokio::task::spawn_blocking(|| bind().map(|_| ()))
            .await
            .map_err(|e| RasterizationError::Failed {
                detail: format!("bind task panicked: {e}"),
            })?
    }
}

fn bind() -> Result<Pdfium, RasterizationError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| RasterizationError::ToolMissing {
        tool: "pdfium".to_string(),
        detail: format!("{e:?}; set PDFIUM_LIB_PATH to libpdfium"),
    })?;
    Ok(Pdfium::new(bindings))
}

fn render_blocking(
    pdf: &Path,
    dpi: u32,
    max_pixels: Option<u32>,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, RasterizationError> {
    let pdfium = bind()?;

    let document = pdfium
        .load_pdf_from_file(pdf, None)
        .map_err(|e| RasterizationError::Unreadable {
            path: pdf.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total == 0 {
        return Err(RasterizationError::NoPages {
            path: pdf.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages", total);

    let mut render_config =
        PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);
    if let Some(px) = max_pixels {
        render_config = render_config
            .set_maximum_width(px as i32)
            .set_maximum_height(px as i32);
    }

    let width = total.to_string().len();
    let mut images = Vec::with_capacity(total);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RasterizationError::Failed {
                detail: format!("page {}: {e:?}", idx + 1),
            })?;

        let image = bitmap.as_image();
        let path = out_dir.join(format!("page-{:0width$}.png", idx + 1, width = width));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| RasterizationError::Failed {
                detail: format!("page {}: cannot write {}: {e}", idx + 1, path.display()),
            })?;

        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(path);
    }

    Ok(images)
}
