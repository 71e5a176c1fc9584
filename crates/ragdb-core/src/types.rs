//! Domain types shared by the retrieval, ranking, and validation stages.

use serde::{Deserialize, Serialize};

/// Globally unique chunk identifier. Assigned once at ingest, never reused.
pub type ChunkId = u64;

/// A chunk of a source document that is independently retrievable.
///
/// - `id`: globally unique chunk identifier
/// - `doc_id`: stable document identity (file stem or external id)
/// - `doc_path`: original path to the source file
/// - `text`: the text payload of the chunk
/// - `position`: position within the parent document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub text: String,
    pub position: usize,
}

/// A chunk together with its pre-computed embedding, as stored by the index.
///
/// `embedder_id` tags the embedding with the model version that produced it;
/// vectors from different embedders are never compared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    pub embedder_id: String,
}

/// Indicates which retriever produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RetrieverKind {
    Sparse,
    Dense,
}

/// Output of a single retriever for a single query string.
///
/// `rank` is the 0-based position in that retriever's ordering. `raw_score`
/// is retriever-native (BM25 points, distance-derived similarity) and is not
/// comparable across retriever kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub chunk_id: ChunkId,
    pub raw_score: f32,
    pub rank: usize,
    pub retriever: RetrieverKind,
}

/// One retriever's contribution to a fused result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSource {
    pub retriever: RetrieverKind,
    pub rank: usize,
}

/// A chunk after reciprocal rank fusion. Fused scores are comparable within
/// one fusion run only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedResult {
    pub chunk_id: ChunkId,
    pub score: f64,
    pub provenance: Vec<RankedSource>,
}

/// The working currency between stages once scores have been normalized
/// into `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub score: f64,
}

/// How a request is retrieved. Selected once per request; each variant maps
/// to a fixed sub-pipeline composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    Sparse,
    Dense,
    Hybrid { rerank: bool },
}

impl RetrievalMethod {
    /// Stable name used in stats and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RetrievalMethod::Sparse => "sparse",
            RetrievalMethod::Dense => "dense",
            RetrievalMethod::Hybrid { rerank: true } => "hybrid_rerank",
            RetrievalMethod::Hybrid { rerank: false } => "hybrid",
        }
    }
}

/// Ordered query reformulations. Element 0 is always the original user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVariantSet(Vec<String>);

impl QueryVariantSet {
    pub fn new(original: impl Into<String>) -> Self {
        Self(vec![original.into()])
    }

    /// Appends a reformulation, ignoring empty strings and duplicates.
    pub fn push(&mut self, variant: impl Into<String>) {
        let v = variant.into();
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.0.iter().any(|existing| existing == trimmed) {
            return;
        }
        self.0.push(trimmed.to_string());
    }

    pub fn original(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Corpus-wide statistics exposed by a sparse retriever for keyword
/// re-scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorpusStats {
    pub doc_count: u64,
    pub avg_doc_len: f32,
}

/// Results of entropy-based retrieval-consistency validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyAnalysis {
    pub is_confident: bool,
    pub confidence_score: f64,
    pub retrieval_entropy: f64,
    pub semantic_consistency: f64,
    pub interpretation: String,
}

/// Coarse grounding label derived from the overlap ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundingLabel {
    High,
    Medium,
    Low,
}

/// Results of the answer/source lexical-overlap check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingCheck {
    pub is_grounded: bool,
    pub overlap_ratio: f64,
    pub confidence: GroundingLabel,
}

/// Combined validation block attached to every query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub entropy_analysis: EntropyAnalysis,
    pub grounding_check: GroundingCheck,
    pub overall_confidence: f64,
}

/// Retrieval-stage counters exposed for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub method: String,
    pub total_retrieved: usize,
    pub after_dedup: usize,
    pub after_rerank: usize,
    pub after_mmr: usize,
}

/// A selected source chunk as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChunk {
    pub chunk_id: ChunkId,
    pub text: String,
    pub score: f64,
    pub doc_id: String,
    pub position: usize,
}

/// Complete result of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub source_chunks: Vec<SourceChunk>,
    pub query_variants: Vec<String>,
    pub validation: ValidationReport,
    pub stats: RetrievalStats,
    /// Degradations absorbed during execution ("expansion_failed",
    /// "dense_unavailable", ...). Empty on a clean run.
    pub degraded: Vec<String>,
}
