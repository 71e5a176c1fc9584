//! ragdb-embed
//!
//! Deterministic feature-hashing embedder. Model inference lives behind the
//! `Embedder` trait as an external collaborator; this crate ships the
//! offline implementation the indexer, pipeline, and every test run on.
//! Vectors are stable across processes and platforms for a given embedder
//! id, which is what the dense index and the entropy validator require.

use anyhow::Result;
use std::hash::Hasher;
use twox_hash::XxHash64;

use ragdb_core::traits::Embedder;

pub const DEFAULT_DIM: usize = 256;

const EMBEDDER_ID: &str = "hash-v1";

/// Hashes word unigrams and bigrams into a fixed number of signed buckets
/// and L2-normalizes the result. Texts sharing vocabulary land near each
/// other; the sign bit keeps unrelated tokens from only ever adding up.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        EMBEDDER_ID
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        for token in &tokens {
            bump(&mut v, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let joined = format!("{} {}", pair[0], pair[1]);
            bump(&mut v, joined.as_bytes(), 0.5);
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

fn bump(v: &mut [f32], feature: &[u8], weight: f32) {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(feature);
    let h = hasher.finish();
    let sign = if h & 1 == 1 { 1.0 } else { -1.0 };
    let bucket = ((h >> 1) as usize) % v.len();
    v[bucket] += sign * weight;
}

pub fn default_embedder() -> Box<dyn Embedder> {
    Box::new(HashEmbedder::default())
}
