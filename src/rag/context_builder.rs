//! RAG Context Builder.
//!
//! Turns ranked passages into the grounding prompt handed to the answer
//! synthesizer:
//! 1. Order passages by descending score
//! 2. Drop repeated chunk ids
//! 3. Concatenate until the context budget is spent (the best passage is
//!    always kept)

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::store::RankedResult;
use crate::core::config::defaults;

/// Configuration for context building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum total passage length in characters
    pub max_context_chars: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_chars: defaults::max_context_chars(),
        }
    }
}

/// A grounding prompt plus the passages that made it in.
#[derive(Debug, Clone)]
pub struct GroundedPrompt {
    pub prompt: String,
    pub passages: Vec<RankedResult>,
}

#[derive(Debug, Clone, Default)]
pub struct RAGContextBuilder {
    config: ContextBuilderConfig,
}

impl RAGContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextBuilderConfig {
        &self.config
    }

    /// Selects passages in descending score order, deduplicated by id.
    pub fn select_passages(&self, ranked: &[RankedResult]) -> Vec<RankedResult> {
        let mut ordered: Vec<&RankedResult> = ranked.iter().collect();
        ordered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        let mut used_chars = 0usize;

        for result in ordered {
            if !seen.insert(result.chunk.id.as_str()) {
                continue;
            }

            let chars = result.chunk.text.chars().count();
            if !selected.is_empty() && used_chars + chars > self.config.max_context_chars {
                break;
            }

            used_chars += chars;
            selected.push(result.clone());
        }

        selected
    }

    pub fn build_prompt(&self, query: &str, ranked: &[RankedResult]) -> GroundedPrompt {
        let passages = self.select_passages(ranked);
        let knowledge = passages
            .iter()
            .map(|p| p.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Use the following knowledge to answer the question:\n\nKnowledge:\n{}\n\nQuestion:\n{}\n\nAnswer:",
            knowledge, query
        );

        GroundedPrompt { prompt, passages }
    }
}
