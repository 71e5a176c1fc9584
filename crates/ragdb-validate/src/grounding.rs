//! Lexical grounding check: does the generated answer actually come from
//! the source chunks it cites?

use std::collections::HashSet;

use ragdb_core::config::PipelineConfig;
use ragdb_core::types::{GroundingCheck, GroundingLabel};

/// Content words of a text: lowercased, split on non-alphanumeric
/// boundaries, short tokens dropped. Applied identically to the answer and
/// the source sides so the overlap ratio stays comparable.
fn content_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_string)
        .collect()
}

/// `overlap_ratio = |answer ∩ union(sources)| / |answer|`.
///
/// An answer with no content tokens scores 0 by definition rather than
/// dividing by zero. The ratio is always in `[0, 1]`.
pub fn check_grounding(answer: &str, sources: &[String], config: &PipelineConfig) -> GroundingCheck {
    let answer_tokens = content_tokens(answer);
    if answer_tokens.is_empty() {
        return GroundingCheck {
            is_grounded: false,
            overlap_ratio: 0.0,
            confidence: GroundingLabel::Low,
        };
    }

    let mut source_tokens: HashSet<String> = HashSet::new();
    for source in sources {
        source_tokens.extend(content_tokens(source));
    }

    let overlapping = answer_tokens.intersection(&source_tokens).count();
    let overlap_ratio = overlapping as f64 / answer_tokens.len() as f64;

    GroundingCheck {
        is_grounded: overlap_ratio >= config.grounding_threshold,
        overlap_ratio,
        confidence: label_for(overlap_ratio, config),
    }
}

fn label_for(ratio: f64, config: &PipelineConfig) -> GroundingLabel {
    if ratio >= config.grounding_high {
        GroundingLabel::High
    } else if ratio >= config.grounding_medium {
        GroundingLabel::Medium
    } else {
        GroundingLabel::Low
    }
}
