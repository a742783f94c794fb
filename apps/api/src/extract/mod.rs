//! Document Text Extractor — turns an uploaded resume file into plain text.
//!
//! Dispatch is by filename extension (case-insensitive):
//! - `.pdf`          → PDF text layer via `pdf-extract`
//! - `.doc` / `.docx` → OOXML body text (see `docx`)
//! - anything else   → bytes decoded as UTF-8, invalid sequences replaced
//!
//! PDF and Word parsing are CPU-bound and run inside `tokio::task::spawn_blocking`.
//! A panic inside a parser surfaces as `ExtractionError::Aborted`, never as a crashed worker.

mod docx;

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unreadable PDF: {0}")]
    Pdf(String),

    #[error("unreadable Word document: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Word document has no word/document.xml part")]
    MissingDocumentPart,

    #[error("failed to read document contents: {0}")]
    Io(#[from] std::io::Error),

    #[error("document parser aborted: {0}")]
    Aborted(String),
}

/// File types the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
    PlainText,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("doc") | Some("docx") => DocumentKind::Word,
            _ => DocumentKind::PlainText,
        }
    }
}

/// Extracts plain text from an uploaded file, off the async executor.
pub async fn extract_text(bytes: Bytes, filename: &str) -> Result<String, ExtractionError> {
    let kind = DocumentKind::from_filename(filename);
    debug!("Extracting {} bytes from '{filename}' as {kind:?}", bytes.len());

    if kind == DocumentKind::PlainText {
        return Ok(decode_plain_text(&bytes));
    }

    tokio::task::spawn_blocking(move || extract_text_sync(&bytes, kind))
        .await
        .map_err(|e| ExtractionError::Aborted(e.to_string()))?
}

/// Synchronous core of `extract_text`. Must not be called on an async worker thread
/// for PDF or Word input.
pub fn extract_text_sync(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
        }
        DocumentKind::Word => docx::extract_docx_text(bytes),
        DocumentKind::PlainText => Ok(decode_plain_text(bytes)),
    }
}

fn decode_plain_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}


#[cfg(test)]
mod tests {
    use super::fixtures::{minimal_docx, minimal_pdf};
    use super::*;

    #[test]
    fn test_kind_dispatch_is_case_insensitive() {
        assert_eq!(DocumentKind::from_filename("cv.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("cv.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("cv.Docx"), DocumentKind::Word);
        assert_eq!(DocumentKind::from_filename("cv.doc"), DocumentKind::Word);
    }

    #[test]
    fn test_unknown_or_missing_extension_is_plain_text() {
        assert_eq!(DocumentKind::from_filename("cv.txt"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_filename("cv.md"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_filename("resume"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_filename(""), DocumentKind::PlainText);
        // Dotfiles have no extension.
        assert_eq!(DocumentKind::from_filename(".pdf"), DocumentKind::PlainText);
    }

    #[tokio::test]
    async fn test_plain_text_returns_exact_bytes() {
        let raw = "Jane Doe\nRust, Go, Kubernetes\n\tIndented line ✓";
        let text = extract_text(Bytes::from(raw), "notes.txt").await.unwrap();
        assert_eq!(text, raw);
    }

    #[tokio::test]
    async fn test_plain_text_replaces_invalid_utf8() {
        let text = extract_text(Bytes::from_static(b"ok\xffok"), "cv.bin")
            .await
            .unwrap();
        assert_eq!(text, "ok\u{FFFD}ok");
    }

    #[tokio::test]
    async fn test_pdf_fixture_yields_text() {
        let pdf = minimal_pdf("Python SQL Docker");
        let text = extract_text(Bytes::from(pdf), "resume.pdf").await.unwrap();
        assert!(!text.trim().is_empty());
        assert!(text.contains("Python"));
    }

    #[tokio::test]
    async fn test_docx_fixture_yields_text() {
        let docx = minimal_docx(&["Senior Engineer", "Rust &amp; Go"]);
        let text = extract_text(Bytes::from(docx), "Resume.DOCX").await.unwrap();
        assert!(text.contains("Senior Engineer"));
        assert!(text.contains("Rust & Go"));
    }

    #[tokio::test]
    async fn test_doc_extension_reads_ooxml_container() {
        let docx = minimal_docx(&["Data Engineer"]);
        let text = extract_text(Bytes::from(docx), "cv.doc").await.unwrap();
        assert!(text.contains("Data Engineer"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_an_extraction_error() {
        let result = extract_text(Bytes::from_static(b"definitely not a pdf"), "cv.pdf").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_legacy_binary_doc_is_an_extraction_error() {
        // OLE2 compound file signature, not a zip container.
        let ole = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
        let result = extract_text(Bytes::from(ole), "cv.doc").await;
        assert!(matches!(result, Err(ExtractionError::Archive(_))));
    }
}
