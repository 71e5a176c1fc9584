//! Configuration loading and the explicit pipeline parameter set.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars. `PipelineConfig` is an immutable value passed through every
//! component call, so the same pipeline is reproducible under test with
//! injected parameters.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// How the entropy-side confidence score and the grounding overlap ratio
/// combine into `overall_confidence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceRule {
    Minimum,
    Product,
}

/// All tunable thresholds, weights, and depths of the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// RRF smoothing constant.
    pub rrf_k: u32,
    /// Final number of chunks returned for synthesis.
    pub top_k: usize,
    /// Per-variant retrieval depth; also the entropy top-K.
    pub retrieval_depth: usize,
    /// How many dense candidates the keyword reranker re-scores.
    pub rerank_depth: usize,
    /// MMR relevance/diversity trade-off in `[0, 1]`.
    pub mmr_lambda: f32,
    /// Below this normalized entropy the retrieval is considered consistent.
    pub entropy_threshold: f64,
    /// Minimum overlap ratio for an answer to count as grounded.
    pub grounding_threshold: f64,
    /// Weight of `1 - entropy` in the confidence blend.
    pub entropy_weight: f64,
    /// Weight of semantic consistency in the confidence blend.
    pub consistency_weight: f64,
    /// At most this many consensus chunks enter the pairwise-similarity pass.
    pub consensus_embedding_cap: usize,
    /// Overlap ratio at or above which grounding confidence is "high".
    pub grounding_high: f64,
    /// Overlap ratio at or above which grounding confidence is "medium".
    pub grounding_medium: f64,
    /// Combination rule for `overall_confidence`.
    pub overall_confidence: ConfidenceRule,
    /// Number of reformulations requested on top of the original query.
    pub num_reformulations: usize,
    /// BM25 term-frequency saturation.
    pub bm25_k1: f32,
    /// BM25 length normalization.
    pub bm25_b: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60,
            top_k: 5,
            retrieval_depth: 20,
            rerank_depth: 20,
            mmr_lambda: 0.7,
            entropy_threshold: 0.3,
            grounding_threshold: 0.7,
            entropy_weight: 0.5,
            consistency_weight: 0.5,
            consensus_embedding_cap: 5,
            grounding_high: 0.8,
            grounding_medium: 0.5,
            overall_confidence: ConfidenceRule::Minimum,
            num_reformulations: 3,
            bm25_k1: 1.2,
            bm25_b: 0.75,
        }
    }
}

impl PipelineConfig {
    /// Rejects parameter combinations the pipeline cannot honor.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(Error::InvalidConfig(format!(
                "mmr_lambda must be in [0,1], got {}",
                self.mmr_lambda
            )));
        }
        if self.entropy_weight < 0.0 || self.consistency_weight < 0.0 {
            return Err(Error::InvalidConfig(
                "confidence weights must be non-negative".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
        }
        if self.retrieval_depth == 0 {
            return Err(Error::InvalidConfig(
                "retrieval_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts the `[pipeline]` table, falling back to defaults for any
    /// key not present. The result is validated before use.
    pub fn pipeline(&self) -> anyhow::Result<PipelineConfig> {
        let cfg: PipelineConfig = self
            .figment
            .extract_inner("pipeline")
            .unwrap_or_else(|_| PipelineConfig::default());
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute it is returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
