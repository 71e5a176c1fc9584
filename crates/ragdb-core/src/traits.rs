use crate::types::{ChunkId, ChunkRecord, CorpusStats, RetrievedItem};

/// Corpus-wide term statistics supplied by a sparse retriever for keyword
/// re-scoring. Lookups are infallible: adapters absorb backend errors and
/// report a frequency of zero rather than failing the rerank.
pub trait TermStatistics: Send + Sync {
    fn stats(&self) -> CorpusStats;
    fn doc_frequency(&self, term: &str) -> u64;
}

/// Keyword ranking service. Returned lists are best-first and unique by
/// chunk id.
pub trait SparseRetriever: TermStatistics {
    fn query(&self, text: &str, k: usize) -> anyhow::Result<Vec<RetrievedItem>>;
}

/// Vector-similarity ranking service. Returned lists are best-first, unique
/// by chunk id, with scores already mapped into `(0, 1]`.
pub trait DenseRetriever: Send + Sync {
    fn query(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<RetrievedItem>>;
}

/// Point lookup of stored chunks with their embeddings.
pub trait ChunkStore: Send + Sync {
    fn fetch(&self, id: ChunkId) -> anyhow::Result<Option<ChunkRecord>>;
}

/// Text-to-vector service. Deterministic for a given embedder id.
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Produces up to `n` alternative phrasings of a query. May return fewer
/// than `n`, or fail entirely; both are recoverable for the caller.
pub trait QueryReformulator: Send + Sync {
    fn expand(&self, query: &str, n: usize) -> anyhow::Result<Vec<String>>;
}

/// Produces an answer from the selected chunks. The answer is consumed only
/// by the grounding check; the pipeline never inspects it otherwise.
pub trait AnswerSynthesizer: Send + Sync {
    fn synthesize(&self, query: &str, chunks: &[ChunkRecord]) -> anyhow::Result<String>;
}
