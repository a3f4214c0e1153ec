use std::collections::HashSet;

/// Split a reference slug into its set of hyphen-separated tokens.
pub fn token_set(slug: &str) -> HashSet<&str> {
    slug.split('-').filter(|t| !t.is_empty()).collect()
}

/// Jaccard similarity |a ∩ b| / |a ∪ b|. Two empty sets give 0.0.
pub fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Normalized Levenshtein similarity in [0, 1], 1.0 for identical strings.
///
/// `1 - distance / max(len_a, len_b)` counted in chars; two empty strings are
/// identical and score 1.0.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b).clamp(0.0, 1.0)
}
