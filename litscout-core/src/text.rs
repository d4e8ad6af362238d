//! Text normalization helpers shared by deduplication and scoring

use std::collections::HashSet;

/// Normalize a paper title for comparison: lowercase, punctuation stripped,
/// whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if ch.is_whitespace() {
            out.push(' ');
        }
        // punctuation is dropped entirely
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity over the normalized word sets of two titles, in [0, 1].
///
/// Empty titles are never similar; callers fall back to identifier equality.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_title(a);
    let nb = normalize_title(b);

    let words_a: HashSet<&str> = na.split_whitespace().collect();
    let words_b: HashSet<&str> = nb.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    intersection as f64 / union as f64
}
