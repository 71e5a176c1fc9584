use ragdb_core::types::ScoredChunk;

/// Cosine similarity of two vectors. Returns 0.0 for mismatched dimensions
/// or zero-norm inputs rather than producing NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scale a score list into `[0, 1]` by dividing by its maximum. Lists whose
/// maximum is non-positive are left untouched (there is nothing meaningful
/// to scale against).
pub fn max_normalize(list: &mut [ScoredChunk]) {
    let max = list.iter().map(|s| s.score).fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        for item in list.iter_mut() {
            item.score = (item.score / max).clamp(0.0, 1.0);
        }
    }
}

/// Lowercased alphanumeric word tokens. Shared by the keyword scorer so the
/// query and candidate sides tokenize identically.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
