//! Input validation: make sure a document path is a readable PDF before any
//! adapter sees it.
//!
//! Checking the `%PDF` magic bytes up front turns "rasterizer crashed on a
//! JPEG renamed to .pdf" into a clear `InvalidInput` failure.

use crate::error::DocumentError;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate existence, read permission and PDF magic bytes.
pub fn validate_pdf(path: &Path) -> Result<(), DocumentError> {
    let invalid = |detail: String| DocumentError::InvalidInput {
        path: path.to_path_buf(),
        detail,
    };

    if path.is_dir() {
        return Err(invalid("is a directory".to_string()));
    }

    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => invalid("file not found".to_string()),
        ErrorKind::PermissionDenied => invalid("permission denied".to_string()),
        _ => invalid(e.to_string()),
    })?;

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == PDF_MAGIC => {}
        Ok(()) => {
            return Err(invalid(format!("not a PDF (first bytes: {magic:?})")));
        }
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(invalid("file too short to be a PDF".to_string()));
        }
        Err(e) => return Err(invalid(e.to_string())),
    }

    debug!("Validated PDF input: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.pdf");
        std::fs::write(&p, b"%PDF-1.7\n...").unwrap();
        assert!(validate_pdf(&p).is_ok());
    }

    #[test]
    fn rejects_missing_file() {
        let err = validate_pdf(Path::new("/definitely/not/a/real/file.pdf")).unwrap_err();
        assert!(err.to_string().contains("file not found"), "got: {err}");
    }

    #[test]
    fn rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("photo.pdf");
        std::fs::write(&p, b"\xFF\xD8\xFF\xE0 jpeg").unwrap();
        assert!(matches!(
            validate_pdf(&p),
            Err(DocumentError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_short_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tiny.pdf");
        std::fs::write(&p, b"%P").unwrap();
        assert!(validate_pdf(&p).is_err());
        assert!(validate_pdf(dir.path()).is_err());
    }
}
