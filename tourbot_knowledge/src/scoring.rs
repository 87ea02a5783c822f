use std::collections::HashSet;

fn bigrams(text: &str) -> HashSet<String> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<Vec<char>>()
        .windows(2)
        .map(|w| w.iter().collect())
        .collect()
}

/// Character-bigram Jaccard similarity.
///
/// Works for Chinese text without segmentation. Returns 0.0 if either
/// string has fewer than two non-whitespace characters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn keyword_overlap(a: &str, b: &str) -> f64 {
    let bigrams_a = bigrams(a);
    let bigrams_b = bigrams(b);

    if bigrams_a.is_empty() || bigrams_b.is_empty() {
        return 0.0;
    }

    let intersection = bigrams_a.intersection(&bigrams_b).count();
    let union = bigrams_a.union(&bigrams_b).count();

    intersection as f64 / union as f64
}

/// Share of `needle`'s bigrams that also occur in `haystack`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coverage(needle: &str, haystack: &str) -> f64 {
    let wanted = bigrams(needle);
    if wanted.is_empty() {
        return 0.0;
    }
    let present = bigrams(haystack);
    let hits = wanted.iter().filter(|b| present.contains(*b)).count();

    hits as f64 / wanted.len() as f64
}
