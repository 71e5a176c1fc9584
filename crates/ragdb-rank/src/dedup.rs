use std::collections::HashMap;

use ragdb_core::types::{ChunkId, ScoredChunk};

/// Merge one or more ranked lists into a single list unique by chunk id.
///
/// When a chunk appears more than once, the maximum score observed wins and
/// the earliest-seen position (list-major order) is kept as the tiebreak,
/// so merging is idempotent: deduplicating an already-unique list is a
/// no-op.
pub fn dedup(lists: &[Vec<ScoredChunk>]) -> Vec<ScoredChunk> {
    // chunk id -> (best score, first-seen position)
    let mut best: HashMap<ChunkId, (f64, usize)> = HashMap::new();
    let mut position = 0usize;
    for list in lists {
        for item in list {
            let entry = best.entry(item.chunk_id).or_insert((item.score, position));
            if item.score > entry.0 {
                entry.0 = item.score;
            }
            position += 1;
        }
    }

    let mut merged: Vec<(ChunkId, f64, usize)> =
        best.into_iter().map(|(id, (score, seen))| (id, score, seen)).collect();
    merged.sort_by(|a, b| {
        b.1.total_cmp(&a.1).then_with(|| a.2.cmp(&b.2)).then_with(|| a.0.cmp(&b.0))
    });
    merged.into_iter().map(|(chunk_id, score, _)| ScoredChunk { chunk_id, score }).collect()
}
