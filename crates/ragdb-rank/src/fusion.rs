//! Reciprocal Rank Fusion: score = Σ 1/(k + rank + 1) over contributing
//! retrievers, with rank 0-based.
//!
//! RRF combines ranked lists without comparing retriever-native scores,
//! which live on incompatible scales (BM25 points vs similarity).

use std::collections::HashMap;

use ragdb_core::types::{ChunkId, FusedResult, RankedSource, RetrievedItem};

/// Fuse one ranked list per retriever into a single ranking.
///
/// Each input list must be unique by chunk id and ordered best-first; the
/// 0-based position in the list is the rank that contributes, not any score
/// carried on the items. Chunks absent from a list contribute nothing for
/// that retriever.
///
/// Ties on fused score break by (a) presence in more retrievers, then
/// (b) ascending chunk id, so the ordering is total and repeated runs are
/// identical.
pub fn reciprocal_rank_fusion(lists: &[Vec<RetrievedItem>], k: u32) -> Vec<FusedResult> {
    let mut acc: HashMap<ChunkId, FusedResult> = HashMap::new();

    for list in lists {
        for (rank, item) in list.iter().enumerate() {
            let contribution = 1.0 / (f64::from(k) + rank as f64 + 1.0);
            let entry = acc.entry(item.chunk_id).or_insert_with(|| FusedResult {
                chunk_id: item.chunk_id,
                score: 0.0,
                provenance: Vec::new(),
            });
            entry.score += contribution;
            entry.provenance.push(RankedSource { retriever: item.retriever, rank });
        }
    }

    let mut fused: Vec<FusedResult> = acc.into_values().collect();
    fused.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.provenance.len().cmp(&a.provenance.len()))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    fused
}
