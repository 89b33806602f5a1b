//! Plain-text extraction from uploaded documents (PDF, DOCX, TXT).

use crate::error::AppError;

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Docx,
    PlainText,
}

impl FileKind {
    fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(FileKind::Pdf)
        } else if lower.ends_with(".docx") {
            Some(FileKind::Docx)
        } else if lower.ends_with(".txt") || lower.ends_with(".md") {
            Some(FileKind::PlainText)
        } else {
            None
        }
    }
}

/// Keeps only `[A-Za-z0-9._-]` from the last path component.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Validates the upload and extracts its text on the blocking pool.
/// Returns the sanitized filename with the text.
pub async fn extract_text(
    file: UploadedFile,
    max_bytes: usize,
) -> Result<(String, String), AppError> {
    let filename = sanitize_filename(&file.filename);
    if filename.is_empty() {
        return Err(AppError::BadRequest("Invalid filename.".to_string()));
    }

    if file.bytes.len() > max_bytes {
        return Err(AppError::BadRequest(format!(
            "File too large. Maximum size is {}MB.",
            max_bytes / (1024 * 1024)
        )));
    }

    let kind = FileKind::from_filename(&filename).ok_or_else(|| {
        AppError::BadRequest(
            "Unsupported file type. Only PDF, DOCX and TXT files are supported.".to_string(),
        )
    })?;

    let bytes = file.bytes;
    let text = tokio::task::spawn_blocking(move || extract_bytes(kind, &bytes))
        .await
        .map_err(|e| {
            // Parser crates can panic on malformed input.
            if e.is_panic() {
                tracing::warn!("Extraction of {} panicked", filename);
                AppError::BadRequest(format!("Could not process file {}.", filename))
            } else {
                AppError::InternalServerError(format!("extraction task failed: {}", e))
            }
        })??;

    if text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "No readable text could be extracted.".to_string(),
        ));
    }

    tracing::info!("Extracted {} chars from {}", text.len(), filename);
    Ok((filename, text))
}

fn extract_bytes(kind: FileKind, bytes: &[u8]) -> Result<String, AppError> {
    match kind {
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
        FileKind::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::BadRequest("Text file is not valid UTF-8.".to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, AppError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        tracing::warn!("PDF extraction failed: {}", e);
        AppError::BadRequest("Could not process file: unreadable PDF.".to_string())
    })?;

    // Pages are separated by form feeds; keep non-empty ones.
    let pages: Vec<&str> = text
        .split('\u{000C}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect();

    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String, AppError> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let docx = docx_rs::read_docx(bytes).map_err(|e| {
        tracing::warn!("DOCX extraction failed: {:?}", e);
        AppError::BadRequest("Could not process file: unreadable DOCX.".to_string())
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            let mut text = String::new();
            for pc in &para.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            if !text.trim().is_empty() {
                paragraphs.push(text);
            }
        }
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/pass wd.txt"), "passwd.txt");
        assert_eq!(sanitize_filename("C:\\docs\\notes (1).pdf"), "notes1.pdf");
        assert_eq!(sanitize_filename("???"), "");
    }

    #[tokio::test]
    async fn plain_text_is_returned_verbatim() {
        let (name, text) = extract_text(upload("notes.txt", b"Cells divide."), 1024)
            .await
            .unwrap();
        assert_eq!(name, "notes.txt");
        assert_eq!(text, "Cells divide.");
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let err = extract_text(upload("image.png", b"\x89PNG"), 1024).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("Unsupported file type")));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let err = extract_text(upload("big.txt", &vec![b'a'; 2048]), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("File too large")));
    }

    #[tokio::test]
    async fn blank_text_file_has_no_readable_text() {
        let err = extract_text(upload("blank.txt", b"  \n "), 1024).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("No readable text")));
    }

    #[tokio::test]
    async fn invalid_filename_is_rejected() {
        let err = extract_text(upload("%%%", b"text"), 1024).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid filename."));
    }

    #[tokio::test]
    async fn garbage_pdf_is_a_bad_request() {
        let err = extract_text(upload("fake.pdf", b"This is not a PDF"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn garbage_docx_is_a_bad_request() {
        let err = extract_text(upload("fake.docx", b"not a zip archive"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
