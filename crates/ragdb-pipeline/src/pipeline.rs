//! End-to-end query execution.
//!
//! One execution: expand the query into variants, run the retrieval path
//! for every variant in parallel against a single pinned index snapshot,
//! measure cross-variant agreement, diversity-select the merged candidate
//! ranking, hand the selection to the synthesizer, and ground-check the
//! answer. Collaborator failures degrade the result; the execution itself
//! is total.

use std::sync::Arc;

use futures::future::join_all;

use ragdb_core::config::PipelineConfig;
use ragdb_core::error::Error;
use ragdb_core::snapshot::{IndexManager, IndexSnapshot};
use ragdb_core::traits::{AnswerSynthesizer, ChunkStore, Embedder, QueryReformulator};
use ragdb_core::types::{
    ChunkRecord, QueryOutcome, QueryVariantSet, RetrievalMethod, RetrievalStats, ScoredChunk,
    SourceChunk, ValidationReport,
};
use ragdb_rank::{dedup, maximal_marginal_relevance, MmrCandidate};
use ragdb_validate::entropy::VariantRetrieval;
use ragdb_validate::{analyze, check_grounding, overall_confidence};

use crate::retrieval::{RetrievalService, VariantOutcome};

pub struct QueryPipeline {
    indexes: Arc<IndexManager>,
    embedder: Arc<dyn Embedder>,
    reformulator: Arc<dyn QueryReformulator>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(
        indexes: Arc<IndexManager>,
        embedder: Arc<dyn Embedder>,
        reformulator: Arc<dyn QueryReformulator>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        config: PipelineConfig,
    ) -> Self {
        Self { indexes, embedder, reformulator, synthesizer, config }
    }

    pub async fn execute(&self, query: &str, method: RetrievalMethod) -> QueryOutcome {
        let mut degraded: Vec<String> = Vec::new();

        let variants = self.expand(query, &mut degraded);
        let snapshot = self.indexes.snapshot();
        let outcomes = self.run_variants(&variants, snapshot.clone(), method).await;
        for outcome in &outcomes {
            for message in &outcome.degraded {
                push_unique(&mut degraded, message.clone());
            }
        }

        let query = query.to_string();
        let method_label = method.label().to_string();
        let config = self.config.clone();
        let synthesizer = Arc::clone(&self.synthesizer);
        let joined = tokio::task::spawn_blocking(move || {
            assemble(
                &query,
                method_label,
                &variants,
                &outcomes,
                snapshot,
                synthesizer.as_ref(),
                &config,
                degraded,
            )
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "result assembly failed");
                empty_outcome(method.label())
            }
        }
    }

    /// Builds the variant set: original first, then reformulations. A
    /// short expansion is padded with template rephrasings; a failed one
    /// falls back to the original query alone and is disclosed both here
    /// and in the validator's interpretation.
    fn expand(&self, query: &str, degraded: &mut Vec<String>) -> QueryVariantSet {
        let mut variants = QueryVariantSet::new(query);
        let want = self.config.num_reformulations + 1;
        match self.reformulator.expand(query, self.config.num_reformulations) {
            Ok(alternatives) => {
                for alt in alternatives.into_iter().take(self.config.num_reformulations) {
                    variants.push(alt);
                }
                if variants.len() < want {
                    if let Ok(fallbacks) =
                        crate::offline::TemplateReformulator.expand(query, want - 1)
                    {
                        for alt in fallbacks {
                            if variants.len() >= want {
                                break;
                            }
                            variants.push(alt);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "query expansion failed, using original query only");
                push_unique(degraded, Error::ExpansionFailure(e.to_string()).to_string());
            }
        }
        variants
    }

    /// Fan-out: the per-variant retrieval passes are independent reads of
    /// the same snapshot, so they run in parallel and join before any
    /// cross-variant statistics are computed. Output order follows variant
    /// order regardless of completion order.
    async fn run_variants(
        &self,
        variants: &QueryVariantSet,
        snapshot: Arc<IndexSnapshot>,
        method: RetrievalMethod,
    ) -> Vec<VariantOutcome> {
        let service = Arc::new(RetrievalService::new(
            snapshot,
            Arc::clone(&self.embedder),
            self.config.clone(),
        ));
        let depth = self.config.retrieval_depth;

        let handles: Vec<_> = variants
            .iter()
            .cloned()
            .map(|variant| {
                let service = Arc::clone(&service);
                tokio::task::spawn_blocking(move || service.retrieve(&variant, method, depth))
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "variant retrieval task failed");
                    VariantOutcome {
                        degraded: vec![format!("variant retrieval task failed: {e}")],
                        ..VariantOutcome::default()
                    }
                }
            })
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    query: &str,
    method_label: String,
    variants: &QueryVariantSet,
    outcomes: &[VariantOutcome],
    snapshot: Arc<IndexSnapshot>,
    synthesizer: &dyn AnswerSynthesizer,
    config: &PipelineConfig,
    mut degraded: Vec<String>,
) -> QueryOutcome {
    let total_retrieved: usize = outcomes.iter().map(|o| o.raw_count).sum();

    let lists: Vec<Vec<ScoredChunk>> = outcomes.iter().map(|o| o.ranked.clone()).collect();
    let deduped = dedup(&lists);
    let after_dedup = deduped.len();

    // candidate pool for diversity selection, from the merged ranking
    let pool_size = (config.top_k * 2).min(deduped.len());
    let mut pool: Vec<(ScoredChunk, ChunkRecord)> = Vec::with_capacity(pool_size);
    for scored in deduped.iter().take(pool_size) {
        match fetch_record(snapshot.store.as_ref(), scored.chunk_id) {
            Some(record) => pool.push((scored.clone(), record)),
            None => push_unique(&mut degraded, Error::ChunkUnavailable(scored.chunk_id).to_string()),
        }
    }

    let candidates: Vec<MmrCandidate> = pool
        .iter()
        .map(|(scored, record)| MmrCandidate {
            chunk_id: scored.chunk_id,
            relevance: scored.score,
            embedding: record.embedding.clone(),
        })
        .collect();
    let selected_ids = maximal_marginal_relevance(&candidates, config.mmr_lambda, config.top_k);
    let after_mmr = selected_ids.len();

    let selected: Vec<&(ScoredChunk, ChunkRecord)> = selected_ids
        .iter()
        .filter_map(|id| pool.iter().find(|(scored, _)| scored.chunk_id == *id))
        .collect();

    // cross-variant agreement over the full per-variant rankings
    let variant_sets: Vec<VariantRetrieval> = variants
        .iter()
        .zip(outcomes.iter())
        .map(|(variant, outcome)| VariantRetrieval {
            query: variant.clone(),
            chunk_ids: outcome.ranked.iter().map(|s| s.chunk_id).collect(),
        })
        .collect();
    let entropy_analysis = analyze(
        &variant_sets,
        |id| fetch_record(snapshot.store.as_ref(), id).map(|r| r.embedding),
        config,
    );

    let records: Vec<ChunkRecord> = selected.iter().map(|(_, record)| record.clone()).collect();
    let answer = match synthesizer.synthesize(query, &records) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!(error = %e, "answer synthesis failed");
            push_unique(&mut degraded, format!("answer synthesis failed: {e}"));
            String::new()
        }
    };

    let source_texts: Vec<String> = records.iter().map(|r| r.chunk.text.clone()).collect();
    let grounding_check = check_grounding(&answer, &source_texts, config);
    let overall = overall_confidence(
        config.overall_confidence,
        entropy_analysis.confidence_score,
        grounding_check.overlap_ratio,
    );

    QueryOutcome {
        answer,
        source_chunks: selected
            .iter()
            .map(|(scored, record)| SourceChunk {
                chunk_id: scored.chunk_id,
                text: record.chunk.text.clone(),
                score: scored.score,
                doc_id: record.chunk.doc_id.clone(),
                position: record.chunk.position,
            })
            .collect(),
        query_variants: variants.as_slice().to_vec(),
        validation: ValidationReport {
            entropy_analysis,
            grounding_check,
            overall_confidence: overall,
        },
        stats: RetrievalStats {
            method: method_label,
            total_retrieved,
            after_dedup,
            // reranking reorders inside each variant's pass, it never filters
            after_rerank: after_dedup,
            after_mmr,
        },
        degraded,
    }
}

fn fetch_record(store: &dyn ChunkStore, id: u64) -> Option<ChunkRecord> {
    match store.fetch(id) {
        Ok(Some(record)) if !record.chunk.text.is_empty() && !record.embedding.is_empty() => {
            Some(record)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(chunk_id = id, error = %e, "chunk fetch failed");
            None
        }
    }
}

fn push_unique(list: &mut Vec<String>, message: String) {
    if !list.contains(&message) {
        list.push(message);
    }
}

fn empty_outcome(method_label: &str) -> QueryOutcome {
    let config = PipelineConfig::default();
    let entropy_analysis = analyze(&[], |_| None, &config);
    let grounding_check = check_grounding("", &[], &config);
    QueryOutcome {
        answer: String::new(),
        source_chunks: vec![],
        query_variants: vec![],
        validation: ValidationReport {
            entropy_analysis,
            grounding_check,
            overall_confidence: 0.0,
        },
        stats: RetrievalStats {
            method: method_label.to_string(),
            total_retrieved: 0,
            after_dedup: 0,
            after_rerank: 0,
            after_mmr: 0,
        },
        degraded: vec!["result assembly failed".to_string()],
    }
}
