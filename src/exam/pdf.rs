//! PDF input for question extraction.

use crate::error::{CookbookError, Result};
use std::path::Path;
use tracing::debug;

/// Read the raw bytes of a PDF file.
pub fn read_pdf_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        CookbookError::Pdf(format!("Failed to read PDF file {}: {}", path.display(), e))
    })
}

/// Extract the text layer of a PDF file.
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    let bytes = read_pdf_bytes(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        CookbookError::Pdf(format!("Failed to extract text from {}: {}", path.display(), e))
    })?;

    debug!("Extracted {} characters from {}", text.len(), path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_error() {
        let err = read_pdf_bytes(Path::new("/nonexistent/cre.pdf")).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("PDF error: Failed to read PDF file /nonexistent/cre.pdf: "));
    }

    #[test]
    fn test_reads_bytes_and_rejects_non_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();

        assert_eq!(read_pdf_bytes(&path).unwrap(), b"not really a pdf".to_vec());
        assert!(matches!(extract_pdf_text(&path), Err(CookbookError::Pdf(_))));
    }
}
