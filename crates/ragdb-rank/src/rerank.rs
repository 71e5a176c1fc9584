//! Keyword re-scoring of dense-retrieved candidates.
//!
//! The dense retriever finds semantically similar chunks; this pass
//! re-orders them by the same TF-IDF family the sparse index ranks with,
//! using corpus-wide statistics supplied by the sparse retriever. The
//! keyword score replaces the dense score for ordering, it does not blend
//! with it.

use std::collections::HashMap;

use ragdb_core::traits::TermStatistics;
use ragdb_core::types::{ChunkId, ScoredChunk};

use crate::score::tokenize;

/// A dense-retrieved candidate with its original text, in dense rank order.
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub chunk_id: ChunkId,
    pub text: String,
}

/// Re-order `candidates` by BM25 relevance to `query`.
///
/// Output size equals input size: candidates the keyword scorer judges
/// irrelevant (score <= 0, i.e. no query term present) keep their relative
/// dense order at the bottom of the list.
pub fn rerank<S>(
    query: &str,
    candidates: &[RerankCandidate],
    stats: &S,
    k1: f32,
    b: f32,
) -> Vec<ScoredChunk>
where
    S: TermStatistics + ?Sized,
{
    let corpus = stats.stats();
    let doc_count = corpus.doc_count.max(1) as f64;
    let avg_len = if corpus.avg_doc_len > 0.0 { f64::from(corpus.avg_doc_len) } else { 1.0 };
    let k1 = f64::from(k1);
    let b = f64::from(b);

    // unique query terms, first-occurrence order
    let mut query_terms: Vec<String> = Vec::new();
    for term in tokenize(query) {
        if !query_terms.contains(&term) {
            query_terms.push(term);
        }
    }

    let mut scored: Vec<(usize, f64)> = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let tokens = tokenize(&candidate.text);
        let doc_len = tokens.len() as f64;
        let mut tf: HashMap<&str, u32> = HashMap::new();
        for token in &tokens {
            *tf.entry(token.as_str()).or_default() += 1;
        }

        let mut score = 0.0f64;
        for term in &query_terms {
            let Some(&freq) = tf.get(term.as_str()) else { continue };
            let df = stats.doc_frequency(term) as f64;
            let idf = (1.0 + (doc_count - df + 0.5) / (df + 0.5)).ln();
            let freq = f64::from(freq);
            score += idf * (freq * (k1 + 1.0)) / (freq + k1 * (1.0 - b + b * doc_len / avg_len));
        }
        scored.push((idx, score));
    }

    let mut relevant: Vec<(usize, f64)> =
        scored.iter().copied().filter(|(_, s)| *s > 0.0).collect();
    relevant.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let tail = scored.iter().copied().filter(|(_, s)| *s <= 0.0);

    relevant
        .into_iter()
        .chain(tail)
        .map(|(idx, score)| ScoredChunk {
            chunk_id: candidates[idx].chunk_id,
            score: score.max(0.0),
        })
        .collect()
}
