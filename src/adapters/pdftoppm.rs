//! Rasterizer backed by Poppler's `pdftoppm` CLI.
//!
//! `pdftoppm -r <dpi> -png in.pdf <out_dir>/page` writes one file per page
//! named `page-<n>.png`, where `<n>` is zero-padded to the width of the page
//! count (`page-01.png` … `page-12.png`). Files are ordered by the parsed
//! page number, never by directory order.

use super::Rasterizer;
use crate::error::RasterizationError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

static RE_PAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^page-(\d+)\.png$").expect("valid page file regex"));

/// Runs the `pdftoppm` binary found on `PATH` (or at a configured location).
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftoppm` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizationError> {
        let prefix = out_dir.join("page");
        debug!("Running {} at {} dpi on {}", self.program.display(), dpi, pdf.display());

        let output = Command::new(&self.program)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(&prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RasterizationError::ToolMissing {
                    tool: self.program.display().to_string(),
                    detail: "not found on PATH; install poppler-utils".to_string(),
                },
                _ => RasterizationError::Failed {
                    detail: format!("cannot run {}: {e}", self.program.display()),
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RasterizationError::Unreadable {
                path: pdf.to_path_buf(),
                detail: if stderr.is_empty() {
                    format!("pdftoppm exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        let pages = collect_page_files(out_dir)
            .await
            .map_err(|e| RasterizationError::Failed {
                detail: format!("cannot list {}: {e}", out_dir.display()),
            })?;
        if pages.is_empty() {
            return Err(RasterizationError::NoPages {
                path: pdf.to_path_buf(),
            });
        }

        info!("pdftoppm rendered {} pages from {}", pages.len(), pdf.display());
        Ok(pages)
    }

    /// `pdftoppm -v` prints its version; only a spawn failure matters here.
    async fn check_available(&self) -> Result<(), RasterizationError> {
        Command::new(&self.program)
            .arg("-v")
            .kill_on_drop(true)
            .output()
            .await
            .map(|_| ())
            .map_err(|e| RasterizationError::ToolMissing {
                tool: self.program.display().to_string(),
                detail: e.to_string(),
            })
    }
}

/// List `page-<n>.png` files in `dir`, sorted by `<n>`.
async fn collect_page_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut numbered = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(n) = page_number(&name) {
            numbered.push((n, entry.path()));
        }
    }
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

fn page_number(file_name: &str) -> Option<usize> {
    RE_PAGE_FILE
        .captures(file_name)
        .and_then(|c| c[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_page_numbers() {
        assert_eq!(page_number("page-1.png"), Some(1));
        assert_eq!(page_number("page-07.png"), Some(7));
        assert_eq!(page_number("page-120.png"), Some(120));
        assert_eq!(page_number("page-1.ppm"), None);
        assert_eq!(page_number("other-1.png"), None);
    }

    #[tokio::test]
    async fn page_files_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-02.png", "page-01.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = collect_page_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-01.png", "page-02.png", "page-10.png"]);
    }

    #[test]
    fn missing_binary_is_tool_missing() {
        let r = PdftoppmRasterizer::with_program("/nonexistent/bin/pdftoppm-xyz");
        let dir = tempfile::tempdir().unwrap();
        let err = tokio_test::block_on(r.rasterize(Path::new("a.pdf"), 300, dir.path()))
            .unwrap_err();
        assert!(
            matches!(err, RasterizationError::ToolMissing { .. }),
            "got: {err:?}"
        );
    }

    #[test]
    fn check_reports_missing_binary() {
        let r = PdftoppmRasterizer::with_program("/nonexistent/bin/pdftoppm-xyz");
        assert!(tokio_test::block_on(r.check_available()).is_err());
    }
}
