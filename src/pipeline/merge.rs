//! Merging page texts and writing outputs.

use super::ocr::PageOutcome;
use std::io::{self, Write};
use std::path::Path;

/// Separator between pages: exactly one blank line.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Join page texts in ascending page order. Failed pages contribute an empty
/// block so later pages keep their position.
pub fn merge_pages(outcomes: &[PageOutcome]) -> String {
    debug_assert!(
        outcomes.windows(2).all(|w| w[0].page < w[1].page),
        "page outcomes must be in ascending page order"
    );
    outcomes
        .iter()
        .map(|o| o.result.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Write `contents` to `path`, replacing any previous file.
///
/// Writes to a uniquely named temp file next to `path` and renames it, so
/// readers see either the old or the new file, never a torn one. Concurrent
/// writers to the same path never share a temp file; the last rename wins.
/// Parent directories are created as needed.
pub async fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let path = path.to_path_buf();
    let contents = contents.to_owned();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &contents))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

fn write_atomic_blocking(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".scanlate-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    // On error the temp file is dropped and removed.
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
