//! Offline collaborator implementations.
//!
//! Reformulation and synthesis are LLM territory in a connected
//! deployment; these stand-ins keep the whole pipeline functional with no
//! network and make every test deterministic.

use anyhow::Result;

use ragdb_core::traits::{AnswerSynthesizer, QueryReformulator};
use ragdb_core::types::ChunkRecord;

/// Deterministic template rephrasings of the original question.
pub struct TemplateReformulator;

impl QueryReformulator for TemplateReformulator {
    fn expand(&self, query: &str, n: usize) -> Result<Vec<String>> {
        let stripped = query.trim().trim_end_matches(['?', '.', '!']).trim();
        if stripped.is_empty() {
            return Ok(vec![]);
        }
        let lowered = stripped.to_lowercase();
        let templates = [
            format!("Explain {lowered}"),
            format!("What is {lowered}?"),
            format!("How does {lowered} work?"),
        ];
        Ok(templates.into_iter().take(n).collect())
    }
}

/// Joins the leading sentences of the selected chunks. Extractive by
/// construction, so the grounding check sees only attested tokens.
pub struct ExtractiveSynthesizer {
    pub sentences_per_chunk: usize,
}

impl Default for ExtractiveSynthesizer {
    fn default() -> Self {
        Self { sentences_per_chunk: 1 }
    }
}

impl AnswerSynthesizer for ExtractiveSynthesizer {
    fn synthesize(&self, _query: &str, chunks: &[ChunkRecord]) -> Result<String> {
        let mut parts = Vec::new();
        for record in chunks {
            let text = record.chunk.text.trim();
            if text.is_empty() {
                continue;
            }
            let leading: String = text
                .split_inclusive(['.', '!', '?'])
                .take(self.sentences_per_chunk)
                .collect::<Vec<&str>>()
                .join("")
                .trim()
                .to_string();
            if !leading.is_empty() {
                parts.push(leading);
            }
        }
        Ok(parts.join(" "))
    }
}
