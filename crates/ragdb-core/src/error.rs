use thiserror::Error;

use crate::types::ChunkId;

/// Failure taxonomy for the query pipeline.
///
/// Every variant except `IndexCorrupted` is absorbed inside the pipeline
/// and reflected as degraded confidence or metadata in the result; only a
/// fully unreachable or corrupted index snapshot reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("retriever unavailable ({kind}): {reason}")]
    RetrieverUnavailable { kind: &'static str, reason: String },

    #[error("query expansion failed: {0}")]
    ExpansionFailure(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("chunk {0} missing or malformed")]
    ChunkUnavailable(ChunkId),

    #[error("index snapshot unusable: {0}")]
    IndexCorrupted(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
