//! ragdb-rank
//!
//! Pure ranking algorithms: reciprocal rank fusion, keyword reranking,
//! deduplication, and maximal-marginal-relevance selection. No I/O and no
//! collaborator calls; everything here is a deterministic function of its
//! inputs and the passed-in parameters.

pub mod dedup;
pub mod fusion;
pub mod mmr;
pub mod rerank;
pub mod score;

pub use dedup::dedup;
pub use fusion::reciprocal_rank_fusion;
pub use mmr::{maximal_marginal_relevance, MmrCandidate};
pub use rerank::{rerank, RerankCandidate};
pub use score::{cosine_similarity, max_normalize};
