//! Maximal Marginal Relevance: greedy selection balancing relevance to the
//! query against redundancy with already-selected chunks.

use ragdb_core::types::ChunkId;

use crate::score::cosine_similarity;

/// A deduplicated candidate with its normalized relevance and embedding,
/// in relevance rank order.
#[derive(Debug, Clone)]
pub struct MmrCandidate {
    pub chunk_id: ChunkId,
    pub relevance: f64,
    pub embedding: Vec<f32>,
}

/// Select at most `top_k` diverse chunks.
///
/// Step 0 takes the highest-relevance candidate; every later step maximizes
/// `lambda * relevance - (1 - lambda) * max_similarity_to_selected`. Ties
/// resolve by original candidate order. With `lambda = 1` this degenerates
/// to plain top-k by relevance; with `lambda = 0` to maximum diversity.
pub fn maximal_marginal_relevance(
    candidates: &[MmrCandidate],
    lambda: f32,
    top_k: usize,
) -> Vec<ChunkId> {
    if top_k == 0 || candidates.is_empty() {
        return Vec::new();
    }
    let lambda = f64::from(lambda);

    let mut first = 0usize;
    for i in 1..candidates.len() {
        if candidates[i].relevance > candidates[first].relevance {
            first = i;
        }
    }
    let mut selected: Vec<usize> = vec![first];
    let mut remaining: Vec<usize> = (0..candidates.len()).filter(|&i| i != first).collect();

    while selected.len() < top_k && !remaining.is_empty() {
        let mut best = remaining[0];
        let mut best_score = f64::NEG_INFINITY;
        for &i in &remaining {
            let max_sim = selected
                .iter()
                .map(|&s| f64::from(cosine_similarity(&candidates[i].embedding, &candidates[s].embedding)))
                .fold(f64::NEG_INFINITY, f64::max);
            let score = lambda * candidates[i].relevance - (1.0 - lambda) * max_sim;
            if score > best_score {
                best_score = score;
                best = i;
            }
        }
        selected.push(best);
        remaining.retain(|&i| i != best);
    }

    selected.into_iter().map(|i| candidates[i].chunk_id).collect()
}
