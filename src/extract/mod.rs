//! Text extraction collaborators feeding the retrieval engine.
//!
//! - `pdf`: uploaded PDF documents
//! - `web`: scraped web pages

pub mod pdf;
pub mod web;

pub use web::WebExtractor;

const PREVIEW_CHARS: usize = 1000;

/// First 1000 characters of `text`, with `...` appended when cut.
pub fn text_preview(text: &str) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}
