use ragdb_core::traits::Embedder;
use ragdb_embed::{default_embedder, HashEmbedder, DEFAULT_DIM};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb).max(1e-9)
}

#[test]
fn embedder_shapes_and_determinism() {
    let embedder = default_embedder();
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), DEFAULT_DIM);
    assert_eq!(embedder.dim(), DEFAULT_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6, "same text embeds identically");
    }
}

#[test]
fn shared_vocabulary_is_closer_than_disjoint() {
    let embedder = HashEmbedder::new(128);
    let base = embedder.embed("reciprocal rank fusion of search results").expect("embed");
    let related = embedder.embed("rank fusion combines search results").expect("embed");
    let unrelated = embedder.embed("growing tomatoes in cold climates").expect("embed");

    assert!(cosine(&base, &related) > cosine(&base, &unrelated));
}

#[test]
fn empty_text_embeds_to_finite_vector() {
    let embedder = HashEmbedder::new(64);
    let v = embedder.embed("").expect("embed");
    assert_eq!(v.len(), 64);
    assert!(v.iter().all(|x| x.is_finite()));
}

#[test]
fn case_and_punctuation_do_not_change_the_vector() {
    let embedder = HashEmbedder::default();
    let a = embedder.embed("Entropy-based validation!").expect("embed");
    let b = embedder.embed("entropy based validation").expect("embed");
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() <= 1e-6);
    }
}
