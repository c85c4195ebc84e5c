//! Text normalizer: raw ingested text to knowledge chunks.
//!
//! Every line break is a paragraph boundary. Paragraphs are trimmed and empty
//! ones dropped; an over-long paragraph is split at the last sentence end (or
//! whitespace) that fits. Output is deterministic and normalizing it again
//! returns it unchanged.

use serde::{Deserialize, Serialize};

use crate::core::config::defaults;

const SENTENCE_ENDINGS: [&str; 3] = [". ", "! ", "? "];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Maximum characters per chunk.
    pub max_chunk_chars: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: defaults::max_chunk_chars(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    config: NormalizerConfig,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &str) -> Vec<String> {
        let max_chars = self.config.max_chunk_chars.max(1);
        let mut chunks = Vec::new();

        for paragraph in raw.split('\n') {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            split_long_paragraph(paragraph, max_chars, &mut chunks);
        }

        chunks
    }
}

/// Normalizes with the default chunk limit.
pub fn normalize(raw: &str) -> Vec<String> {
    TextNormalizer::default().normalize(raw)
}

fn split_long_paragraph(paragraph: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut remaining = paragraph;

    loop {
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            if !remaining.is_empty() {
                out.push(remaining.to_string());
            }
            return;
        };

        let window = &remaining[..limit];
        let cut = find_cut(window).unwrap_or(limit);
        let (head, tail) = remaining.split_at(cut);

        let head = head.trim();
        if !head.is_empty() {
            out.push(head.to_string());
        }
        remaining = tail.trim_start();
    }
}

/// Byte offset just after the last sentence ending in `window`, falling back
/// to the last whitespace. `None` means no soft boundary exists.
fn find_cut(window: &str) -> Option<usize> {
    let sentence_cut = SENTENCE_ENDINGS
        .iter()
        .filter_map(|ending| window.rfind(ending).map(|pos| pos + 1))
        .max()
        .filter(|pos| *pos > 0);
    if sentence_cut.is_some() {
        return sentence_cut;
    }

    window
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(pos, _)| pos)
        .last()
        .filter(|pos| *pos > 0)
}
