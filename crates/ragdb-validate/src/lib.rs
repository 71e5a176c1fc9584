//! ragdb-validate
//!
//! Confidence validation for retrieval results: entropy over multi-variant
//! retrieval agreement, lexical grounding of generated answers, and the
//! combination rule that folds both into one overall confidence number.

pub mod entropy;
pub mod grounding;

pub use entropy::{analyze, VariantRetrieval};
pub use grounding::check_grounding;

use ragdb_core::config::ConfidenceRule;

/// Fold the entropy-side confidence score and the grounding overlap ratio
/// into `overall_confidence` according to the configured rule.
pub fn overall_confidence(rule: ConfidenceRule, entropy_confidence: f64, overlap_ratio: f64) -> f64 {
    let combined = match rule {
        ConfidenceRule::Minimum => entropy_confidence.min(overlap_ratio),
        ConfidenceRule::Product => entropy_confidence * overlap_ratio,
    };
    combined.clamp(0.0, 1.0)
}
