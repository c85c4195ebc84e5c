//! PDF upload handling and text extraction.
//!
//! Extraction is page-wise through `pdf-extract`; if that errors or yields
//! only whitespace, `lopdf` is tried once. Pages are reflowed so every output
//! line is one paragraph, which is what the normalizer chunks on.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::rag::RetrievalError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Accepts `filename`/`bytes` as a PDF upload or explains why not.
pub fn validate_upload(filename: &str, bytes: &[u8]) -> Result<(), RetrievalError> {
    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(RetrievalError::Validation(format!(
            "Only PDF files are supported, got '{}'",
            filename
        )));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(RetrievalError::Validation(format!(
            "'{}' is not a valid PDF document",
            filename
        )));
    }
    Ok(())
}

/// Strips directory components and characters unsafe in file names.
pub fn sanitize_filename(name: &str) -> Result<String, RetrievalError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        return Err(RetrievalError::Validation("file name is empty".to_string()));
    }
    Ok(cleaned)
}

/// Writes the upload to `uploads_dir` and returns the saved path.
pub async fn save_upload(
    uploads_dir: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, RetrievalError> {
    let name = sanitize_filename(filename)?;
    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| RetrievalError::extraction("save upload", e))?;

    let path = uploads_dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| RetrievalError::extraction("save upload", e))?;

    debug!("Saved upload to {}", path.display());
    Ok(path)
}

/// Extracts the document text, falling back to `lopdf` once.
pub fn extract_text(bytes: &[u8]) -> Result<String, RetrievalError> {
    // pdf-extract panics on some malformed documents.
    let primary = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| "panicked".to_string())
        .and_then(|result| result.map_err(|e| format!("{:?}", e)))
        .map(|pages| join_pages(&pages));

    match primary {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => warn!("pdf-extract found no text; trying lopdf"),
        Err(e) => warn!("pdf-extract failed ({}); trying lopdf", e),
    }

    let pages = extract_pages_lopdf(bytes)?;
    let text = join_pages(&pages);
    if text.trim().is_empty() {
        return Err(RetrievalError::extraction("pdf", "document contains no extractable text"));
    }
    Ok(text)
}

fn extract_pages_lopdf(bytes: &[u8]) -> Result<Vec<String>, RetrievalError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| RetrievalError::extraction("pdf", e))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => debug!("lopdf skipped page {}: {}", page_number, e),
        }
    }
    Ok(pages)
}

/// Drops the last non-empty line when it is purely numeric.
fn remove_trailing_page_number(page: &str) -> String {
    let lines: Vec<&str> = page.lines().collect();
    let Some(last) = lines.iter().rposition(|l| !l.trim().is_empty()) else {
        return page.to_string();
    };

    if lines[last].trim().chars().all(|c| c.is_ascii_digit()) {
        let mut kept = lines[..last].to_vec();
        kept.extend_from_slice(&lines[last + 1..]);
        kept.join("\n")
    } else {
        page.to_string()
    }
}

/// Joins pages and reflows wrapped lines: blank lines separate paragraphs,
/// each paragraph becomes one output line. A word hyphenated across a line
/// break is joined back together.
fn join_pages(pages: &[String]) -> String {
    let mut paragraphs = Vec::new();

    for page in pages {
        let page = remove_trailing_page_number(page);
        let mut current = String::new();

        for line in page.lines() {
            let line = line.trim();
            if line.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
                continue;
            }

            if current.is_empty() {
                current.push_str(line);
            } else if ends_with_split_word(&current) && starts_lowercase(line) {
                current.pop();
                current.push_str(line);
            } else {
                current.push(' ');
                current.push_str(line);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }
    }

    paragraphs.join("\n")
}

fn ends_with_split_word(text: &str) -> bool {
    let mut tail = text.chars().rev();
    matches!((tail.next(), tail.next()), (Some('-'), Some(c)) if c.is_alphanumeric())
}

fn starts_lowercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_lowercase)
}
