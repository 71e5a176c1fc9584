use ragdb_core::config::{ConfidenceRule, PipelineConfig};
use ragdb_core::types::{ChunkId, GroundingLabel};
use ragdb_validate::entropy::{analyze, consensus_chunks, frequency_table, VariantRetrieval};
use ragdb_validate::{check_grounding, overall_confidence};

fn variant(query: &str, ids: &[ChunkId]) -> VariantRetrieval {
    VariantRetrieval { query: query.to_string(), chunk_ids: ids.to_vec() }
}

fn no_embeddings(_: ChunkId) -> Option<Vec<f32>> {
    None
}

fn unit_embeddings(ids: &[ChunkId]) -> impl Fn(ChunkId) -> Option<Vec<f32>> + '_ {
    move |id| {
        if ids.contains(&id) {
            Some(vec![0.6, 0.8, 0.0])
        } else {
            None
        }
    }
}

#[test]
fn identical_variant_sets_have_zero_entropy() {
    let variants = vec![
        variant("original", &[1, 2, 3]),
        variant("rephrased", &[3, 1, 2]),
        variant("another", &[2, 3, 1]),
    ];
    let analysis = analyze(&variants, unit_embeddings(&[1, 2, 3]), &PipelineConfig::default());

    assert!(analysis.retrieval_entropy.abs() < 1e-12, "full agreement is zero entropy");
    assert!(analysis.is_confident);
    assert!(analysis.interpretation.starts_with("HIGH CONFIDENCE"));
    assert!(analysis.interpretation.contains("3/3"));
}

#[test]
fn disjoint_variant_sets_have_maximal_entropy() {
    let variants = vec![
        variant("a", &[1, 2, 3]),
        variant("b", &[4, 5, 6]),
        variant("c", &[7, 8, 9]),
    ];
    let analysis = analyze(&variants, no_embeddings, &PipelineConfig::default());

    assert!(analysis.retrieval_entropy > 0.99, "pairwise disjoint sets approach 1.0");
    assert!(!analysis.is_confident);
    assert!(analysis.interpretation.starts_with("LOW CONFIDENCE"));
}

#[test]
fn no_results_reports_maximal_uncertainty_not_an_error() {
    let variants = vec![variant("a", &[]), variant("b", &[])];
    let analysis = analyze(&variants, no_embeddings, &PipelineConfig::default());

    assert!((analysis.retrieval_entropy - 1.0).abs() < 1e-12);
    assert!(!analysis.is_confident);
    assert_eq!(analysis.confidence_score, 0.0);
    assert_eq!(analysis.semantic_consistency, 0.0);
    assert!(analysis.interpretation.starts_with("NO RESULTS"));
}

#[test]
fn single_variant_is_degraded_not_spuriously_confident() {
    let variants = vec![variant("only one", &[1, 2, 3, 4])];
    let analysis = analyze(&variants, no_embeddings, &PipelineConfig::default());

    assert!(analysis.retrieval_entropy.abs() < 1e-12, "one variant has nothing to disagree with");
    assert!(analysis.interpretation.starts_with("DEGRADED MODE"));
}

#[test]
fn frequency_counts_are_per_variant_membership() {
    // duplicate ids inside one variant count once
    let variants = vec![variant("a", &[1, 1, 2]), variant("b", &[1, 3])];
    let counts = frequency_table(&variants);
    assert_eq!(counts[&1], 2);
    assert_eq!(counts[&2], 1);
    assert_eq!(counts[&3], 1);
}

#[test]
fn consensus_requires_majority_of_variants() {
    let variants = vec![
        variant("a", &[1, 2]),
        variant("b", &[1, 3]),
        variant("c", &[1, 2, 4]),
    ];
    let counts = frequency_table(&variants);
    let consensus = consensus_chunks(&counts, variants.len());
    // majority of 3 variants is 2: chunk 1 (3 votes) then chunk 2 (2 votes)
    assert_eq!(consensus, vec![1, 2]);
}

#[test]
fn singleton_consensus_has_full_semantic_consistency() {
    let variants = vec![variant("a", &[1, 2]), variant("b", &[1, 9])];
    let analysis = analyze(&variants, unit_embeddings(&[1]), &PipelineConfig::default());
    assert!((analysis.semantic_consistency - 1.0).abs() < 1e-12);
}

#[test]
fn aligned_consensus_embeddings_score_high_consistency() {
    let variants = vec![
        variant("a", &[1, 2, 3]),
        variant("b", &[1, 2, 3]),
        variant("c", &[1, 2, 7]),
    ];
    // chunks 1 and 2 are consensus and share the same direction
    let analysis = analyze(&variants, unit_embeddings(&[1, 2]), &PipelineConfig::default());
    assert!((analysis.semantic_consistency - 1.0).abs() < 1e-6);
    assert!(analysis.is_confident);
    assert!(analysis.confidence_score > 0.7);
    assert!(analysis.interpretation.starts_with("HIGH CONFIDENCE"));
}

#[test]
fn half_overlapping_variants_land_mid_scale() {
    // sets {1,2} and {1,3}: one shared vote out of two per variant
    let variants = vec![variant("a", &[1, 2]), variant("b", &[1, 3])];
    let counts = frequency_table(&variants);
    let entropy = ragdb_validate::entropy::normalized_entropy(&counts, &[2, 2]);
    assert!((entropy - 0.5).abs() < 1e-9, "got {entropy}");
}

#[test]
fn confidence_blend_uses_configured_weights() {
    let variants = vec![
        variant("a", &[1, 2, 3]),
        variant("b", &[1, 2, 3]),
    ];
    let cfg = PipelineConfig {
        entropy_weight: 1.0,
        consistency_weight: 0.0,
        ..PipelineConfig::default()
    };
    let analysis = analyze(&variants, no_embeddings, &cfg);
    // zero entropy with full weight on the entropy side
    assert!((analysis.confidence_score - 1.0).abs() < 1e-12);

    let cfg = PipelineConfig {
        entropy_weight: 2.0,
        consistency_weight: 2.0,
        ..PipelineConfig::default()
    };
    let analysis = analyze(&variants, no_embeddings, &cfg);
    assert!(analysis.confidence_score <= 1.0, "blend is clamped into [0,1]");
}

#[test]
fn grounding_full_overlap_answer() {
    let cfg = PipelineConfig::default();
    let check = check_grounding(
        "decorator function behavior",
        &["decorator function wraps modifies behavior".to_string()],
        &cfg,
    );
    assert!((check.overlap_ratio - 1.0).abs() < 1e-12);
    assert!(check.is_grounded);
    assert_eq!(check.confidence, GroundingLabel::High);
}

#[test]
fn grounding_empty_answer_is_zero_not_a_fault() {
    let cfg = PipelineConfig::default();
    let check = check_grounding("", &["anything at all".to_string()], &cfg);
    assert_eq!(check.overlap_ratio, 0.0);
    assert!(!check.is_grounded);
    assert_eq!(check.confidence, GroundingLabel::Low);

    // punctuation-only answers tokenize to nothing as well
    let check = check_grounding("?! ... --", &["anything".to_string()], &cfg);
    assert_eq!(check.overlap_ratio, 0.0);
}

#[test]
fn grounding_subsequence_answer_is_fully_grounded() {
    let cfg = PipelineConfig::default();
    let sources = vec![
        "Decorators wrap a target function and can modify its behavior.".to_string(),
        "They are applied with the at-sign syntax above the definition.".to_string(),
    ];
    let answer = "Decorators wrap a target function and can modify its behavior.";
    let check = check_grounding(answer, &sources, &cfg);
    assert!((check.overlap_ratio - 1.0).abs() < 1e-12);
    assert!(check.is_grounded);
}

#[test]
fn grounding_ratio_stays_in_bounds_and_buckets_follow_config() {
    let cfg = PipelineConfig::default();
    let check = check_grounding(
        "completely fabricated unsupported claims everywhere",
        &["the source talks about something else".to_string()],
        &cfg,
    );
    assert!((0.0..=1.0).contains(&check.overlap_ratio));
    assert!(!check.is_grounded);
    assert_eq!(check.confidence, GroundingLabel::Low);

    // half the answer tokens attested -> medium with default cut points
    let check = check_grounding(
        "alpha bravo charlie delta",
        &["alpha bravo unrelated words".to_string()],
        &cfg,
    );
    assert!((check.overlap_ratio - 0.5).abs() < 1e-12);
    assert_eq!(check.confidence, GroundingLabel::Medium);
    assert!(!check.is_grounded, "0.5 is below the 0.7 grounding threshold");
}

#[test]
fn overall_confidence_rules() {
    assert!((overall_confidence(ConfidenceRule::Minimum, 0.9, 0.4) - 0.4).abs() < 1e-12);
    assert!((overall_confidence(ConfidenceRule::Product, 0.5, 0.5) - 0.25).abs() < 1e-12);
    assert_eq!(overall_confidence(ConfidenceRule::Product, 0.0, 1.0), 0.0);
}
