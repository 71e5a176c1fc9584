//! Entropy-based retrieval-consistency validation.
//!
//! Robust answers should converge on the same evidence when the question
//! is asked in different words. Each query variant's top-K retrieval is
//! treated as a vote; the Shannon entropy of the resulting chunk-frequency
//! distribution measures how scattered those votes are. Low entropy means
//! the variants agree on the evidence, high entropy means each phrasing
//! pulled up different chunks.

use std::collections::{HashMap, HashSet};

use ragdb_core::config::PipelineConfig;
use ragdb_core::types::{ChunkId, EntropyAnalysis};
use ragdb_rank::cosine_similarity;

/// One query variant's retrieval outcome: the top-K chunk ids in rank order.
#[derive(Debug, Clone)]
pub struct VariantRetrieval {
    pub query: String,
    pub chunk_ids: Vec<ChunkId>,
}

/// `count(chunk) = number of variants whose top-K set contains it`.
pub fn frequency_table(variants: &[VariantRetrieval]) -> HashMap<ChunkId, usize> {
    let mut counts: HashMap<ChunkId, usize> = HashMap::new();
    for variant in variants {
        let unique: HashSet<ChunkId> = variant.chunk_ids.iter().copied().collect();
        for id in unique {
            *counts.entry(id).or_default() += 1;
        }
    }
    counts
}

/// Normalized Shannon entropy of the cross-variant count distribution.
///
/// `variant_sizes` are the unique-set sizes that produced `counts` (their
/// sum equals the count total). Raw entropy `H = -Σ p ln p` is bounded
/// below by `ln(largest variant set)`, reached when every variant returns
/// the same set, and above by `ln(total votes)`, reached when the sets
/// are pairwise disjoint. Scaling H between those two bounds maps perfect
/// agreement to 0 and total disagreement to 1 for any variant count and
/// retrieval depth.
///
/// Degenerate inputs: an empty table is maximal uncertainty (1.0); a single
/// distinct chunk, or bounds that coincide (e.g. one usable variant), mean
/// there is nothing to disagree about (0.0).
pub fn normalized_entropy(counts: &HashMap<ChunkId, usize>, variant_sizes: &[usize]) -> f64 {
    if counts.is_empty() {
        return 1.0;
    }
    if counts.len() == 1 {
        return 0.0;
    }
    let total: usize = variant_sizes.iter().sum();
    let largest: usize = variant_sizes.iter().copied().max().unwrap_or(0);
    if total == 0 || largest == 0 {
        return 1.0;
    }
    let floor = (largest as f64).ln();
    let ceiling = (total as f64).ln();
    if ceiling <= floor {
        return 0.0;
    }

    let total = total as f64;
    let mut entropy = 0.0f64;
    for &count in counts.values() {
        let p = count as f64 / total;
        entropy -= p * p.ln();
    }
    ((entropy - floor) / (ceiling - floor)).clamp(0.0, 1.0)
}

/// Chunks appearing in at least a majority of variants, highest count
/// first, ties by ascending id.
pub fn consensus_chunks(counts: &HashMap<ChunkId, usize>, num_variants: usize) -> Vec<ChunkId> {
    let majority = (num_variants + 1) / 2;
    let mut consensus: Vec<(ChunkId, usize)> = counts
        .iter()
        .map(|(&id, &count)| (id, count))
        .filter(|&(_, count)| count >= majority)
        .collect();
    consensus.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    consensus.into_iter().map(|(id, _)| id).collect()
}

/// Run the full analysis over per-variant retrieval sets.
///
/// `embedding_of` resolves a chunk id to its stored embedding; lookups that
/// fail are skipped rather than failing the analysis (a missing record only
/// shrinks the consistency sample).
pub fn analyze<F>(
    variants: &[VariantRetrieval],
    embedding_of: F,
    config: &PipelineConfig,
) -> EntropyAnalysis
where
    F: Fn(ChunkId) -> Option<Vec<f32>>,
{
    let counts = frequency_table(variants);

    if counts.is_empty() {
        return EntropyAnalysis {
            is_confident: false,
            confidence_score: 0.0,
            retrieval_entropy: 1.0,
            semantic_consistency: 0.0,
            interpretation: "NO RESULTS: no relevant chunks were retrieved for any query variant."
                .to_string(),
        };
    }

    let single_variant = variants.len() < 2;
    let variant_sizes: Vec<usize> = variants
        .iter()
        .map(|v| v.chunk_ids.iter().copied().collect::<HashSet<ChunkId>>().len())
        .collect();
    // One variant's agreement bounds coincide, so its entropy is trivially
    // 0; the degraded mode is disclosed in the interpretation instead of
    // letting that read as genuine cross-variant consensus.
    let retrieval_entropy =
        if single_variant { 0.0 } else { normalized_entropy(&counts, &variant_sizes) };

    let consensus = consensus_chunks(&counts, variants.len());
    let embeddings: Vec<Vec<f32>> = consensus
        .iter()
        .take(config.consensus_embedding_cap)
        .filter_map(|&id| embedding_of(id))
        .collect();
    let semantic_consistency = mean_pairwise_similarity(&embeddings);

    let blended = config.entropy_weight * (1.0 - retrieval_entropy)
        + config.consistency_weight * semantic_consistency;
    let confidence_score = blended.clamp(0.0, 1.0);
    let is_confident = retrieval_entropy < config.entropy_threshold;

    let max_count = counts.values().copied().max().unwrap_or(0);
    let interpretation = interpret(
        retrieval_entropy,
        is_confident,
        single_variant,
        max_count,
        variants.len(),
    );

    tracing::debug!(
        entropy = retrieval_entropy,
        consistency = semantic_consistency,
        confidence = confidence_score,
        consensus = consensus.len(),
        "entropy validation"
    );

    EntropyAnalysis {
        is_confident,
        confidence_score,
        retrieval_entropy,
        semantic_consistency,
        interpretation,
    }
}

/// Mean pairwise cosine similarity, defined as 1.0 for 0 or 1 members
/// (a singleton consensus cannot disagree with itself).
fn mean_pairwise_similarity(embeddings: &[Vec<f32>]) -> f64 {
    if embeddings.len() < 2 {
        return 1.0;
    }
    let mut sum = 0.0f64;
    let mut pairs = 0usize;
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            sum += f64::from(cosine_similarity(&embeddings[i], &embeddings[j]));
            pairs += 1;
        }
    }
    (sum / pairs as f64).clamp(0.0, 1.0)
}

fn interpret(
    entropy: f64,
    is_confident: bool,
    single_variant: bool,
    max_count: usize,
    num_variants: usize,
) -> String {
    if single_variant {
        return "DEGRADED MODE: only one usable query variant; cross-variant agreement \
                carries no statistical power. Confidence rests on semantic consistency alone."
            .to_string();
    }
    if is_confident {
        if entropy < 0.2 {
            format!(
                "HIGH CONFIDENCE: query variants converge strongly. Top chunks appear in \
                 {}/{} variants. The answer is well-supported.",
                max_count, num_variants
            )
        } else {
            "MODERATE CONFIDENCE: query variants show reasonable agreement. The answer is \
             likely accurate but may benefit from more context."
                .to_string()
        }
    } else if entropy > 0.7 {
        "LOW CONFIDENCE: query variants retrieve different chunks. Results are \
         inconsistent and carry hallucination risk; consider rephrasing the question."
            .to_string()
    } else {
        "UNCERTAIN: some consistency in retrieval but agreement is weak. The answer may \
         be partially grounded but lacks strong support."
            .to_string()
    }
}
