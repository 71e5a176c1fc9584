//! Per-query-string retrieval sub-pipelines.
//!
//! One [`RetrievalService`] call runs the configured method (sparse,
//! dense, or hybrid with optional keyword reranking) for a single query
//! string against a pinned index snapshot. Failures of individual
//! collaborators degrade the result instead of failing it: an unreachable
//! retriever contributes an empty list, a failed embedding skips the dense
//! path, and every absorbed failure is recorded on the outcome.

use std::sync::Arc;

use ragdb_core::config::PipelineConfig;
use ragdb_core::error::Error;
use ragdb_core::snapshot::IndexSnapshot;
use ragdb_core::traits::Embedder;
use ragdb_core::types::{
    RetrievalMethod, RetrievedItem, RetrieverKind, ScoredChunk,
};
use ragdb_rank::{max_normalize, reciprocal_rank_fusion, rerank, RerankCandidate};

/// Result of running the retrieval path for one query string.
#[derive(Debug, Clone, Default)]
pub struct VariantOutcome {
    /// Unique-by-chunk ranked list, scores normalized into `[0, 1]`.
    pub ranked: Vec<ScoredChunk>,
    /// Raw result volume before fusion and deduplication.
    pub raw_count: usize,
    /// Degradations absorbed along the way.
    pub degraded: Vec<String>,
}

pub struct RetrievalService {
    snapshot: Arc<IndexSnapshot>,
    embedder: Arc<dyn Embedder>,
    config: PipelineConfig,
}

impl RetrievalService {
    pub fn new(
        snapshot: Arc<IndexSnapshot>,
        embedder: Arc<dyn Embedder>,
        config: PipelineConfig,
    ) -> Self {
        Self { snapshot, embedder, config }
    }

    /// Runs one retrieval pass. Total over its inputs: collaborator
    /// failures shrink the result, they never raise.
    pub fn retrieve(&self, query: &str, method: RetrievalMethod, depth: usize) -> VariantOutcome {
        let mut outcome = VariantOutcome::default();
        match method {
            RetrievalMethod::Sparse => {
                let hits = self.sparse_hits(query, depth, &mut outcome);
                outcome.raw_count = hits.len();
                let mut ranked = to_scored(&hits);
                max_normalize(&mut ranked);
                outcome.ranked = ranked;
            }
            RetrievalMethod::Dense => {
                let hits = self.dense_hits(query, depth, &mut outcome);
                outcome.raw_count = hits.len();
                // dense scores are already similarity-mapped into (0, 1]
                outcome.ranked = to_scored(&hits);
            }
            RetrievalMethod::Hybrid { rerank: use_rerank } => {
                let sparse = self.sparse_hits(query, depth, &mut outcome);
                let mut dense = self.dense_hits(query, depth, &mut outcome);
                outcome.raw_count = sparse.len() + dense.len();

                if use_rerank && !dense.is_empty() {
                    dense = self.rerank_dense(query, dense, &mut outcome);
                }

                let fused = reciprocal_rank_fusion(&[sparse, dense], self.config.rrf_k);
                let mut ranked: Vec<ScoredChunk> = fused
                    .into_iter()
                    .map(|f| ScoredChunk { chunk_id: f.chunk_id, score: f.score })
                    .collect();
                max_normalize(&mut ranked);
                ranked.truncate(depth);
                outcome.ranked = ranked;
            }
        }
        outcome
    }

    fn sparse_hits(
        &self,
        query: &str,
        depth: usize,
        outcome: &mut VariantOutcome,
    ) -> Vec<RetrievedItem> {
        match self.snapshot.sparse.query(query, depth) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "sparse retriever unavailable");
                note(
                    outcome,
                    Error::RetrieverUnavailable { kind: "sparse", reason: e.to_string() },
                );
                vec![]
            }
        }
    }

    fn dense_hits(
        &self,
        query: &str,
        depth: usize,
        outcome: &mut VariantOutcome,
    ) -> Vec<RetrievedItem> {
        let vector = match self.embedder.embed(query) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, skipping dense path");
                note(outcome, Error::EmbeddingFailure(e.to_string()));
                return vec![];
            }
        };
        match self.snapshot.dense.query(&vector, depth) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "dense retriever unavailable");
                note(
                    outcome,
                    Error::RetrieverUnavailable { kind: "dense", reason: e.to_string() },
                );
                vec![]
            }
        }
    }

    /// Re-scores the top dense candidates by keyword relevance. The
    /// reranked ordering replaces the dense ordering for those candidates;
    /// anything past `rerank_depth` keeps its dense position after them.
    /// Candidates whose stored text cannot be fetched are skipped, and if
    /// none survive the original dense ranking is kept.
    fn rerank_dense(
        &self,
        query: &str,
        dense: Vec<RetrievedItem>,
        outcome: &mut VariantOutcome,
    ) -> Vec<RetrievedItem> {
        let head = dense.len().min(self.config.rerank_depth);
        let mut candidates = Vec::new();
        for item in dense.iter().take(head) {
            match self.snapshot.store.fetch(item.chunk_id) {
                Ok(Some(record)) if !record.chunk.text.is_empty() => {
                    candidates.push(RerankCandidate {
                        chunk_id: item.chunk_id,
                        text: record.chunk.text,
                    });
                }
                Ok(_) => {
                    tracing::warn!(chunk_id = item.chunk_id, "chunk text missing, skipped in rerank");
                    note(outcome, Error::ChunkUnavailable(item.chunk_id));
                }
                Err(e) => {
                    tracing::warn!(chunk_id = item.chunk_id, error = %e, "chunk fetch failed");
                    note(outcome, Error::ChunkUnavailable(item.chunk_id));
                }
            }
        }
        if candidates.is_empty() {
            return dense;
        }

        let reranked = rerank(
            query,
            &candidates,
            self.snapshot.sparse.as_ref(),
            self.config.bm25_k1,
            self.config.bm25_b,
        );
        reranked
            .into_iter()
            .map(|sc| (sc.chunk_id, sc.score as f32))
            .chain(dense[head..].iter().map(|item| (item.chunk_id, item.raw_score)))
            .enumerate()
            .map(|(rank, (chunk_id, raw_score))| RetrievedItem {
                chunk_id,
                raw_score,
                rank,
                retriever: RetrieverKind::Dense,
            })
            .collect()
    }
}

fn to_scored(hits: &[RetrievedItem]) -> Vec<ScoredChunk> {
    hits.iter()
        .map(|h| ScoredChunk { chunk_id: h.chunk_id, score: f64::from(h.raw_score) })
        .collect()
}

fn note(outcome: &mut VariantOutcome, error: Error) {
    let message = error.to_string();
    if !outcome.degraded.contains(&message) {
        outcome.degraded.push(message);
    }
}
