//! Approximate-match scores.
//!
//! None of these take part in candidate selection; the apply engine only logs them so an
//! operator can see how close a resolved node (or the best near miss) was.

use core_types::AncestorStep;
use std::collections::HashSet;

/// Token-set overlap `|A ∩ B| / |A ∪ B|`. Empty tokens are ignored; two empty sets score 0.
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let a: HashSet<&str> = a.iter().map(AsRef::as_ref).filter(|s| !s.is_empty()).collect();
    let b: HashSet<&str> = b.iter().map(AsRef::as_ref).filter(|s| !s.is_empty()).collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(&b).count();
    inter as f64 / (a.len() + b.len() - inter) as f64
}

/// Edit distance over `char`s, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(row[j])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// `1 - distance / max_len`; 0 when either side is empty.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let max = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(a, b) as f64 / max as f64
}

/// Mean per-level score over the common prefix of two ancestor chains.
///
/// A level scores 1 when both ids are present and equal, otherwise the Jaccard overlap of
/// the class lists.
pub fn ancestor_overlap(a: &[AncestorStep], b: &[AncestorStep]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let total: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let id_score: f64 = if !x.id.is_empty() && x.id == y.id {
                1.0
            } else {
                0.0
            };
            id_score.max(jaccard(&x.classes, &y.classes))
        })
        .sum();
    total / len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, classes: &[&str]) -> AncestorStep {
        AncestorStep {
            tag: "DIV".into(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            id: id.into(),
        }
    }

    #[test]
    fn jaccard_scores() {
        assert_eq!(jaccard::<&str>(&[], &[]), 0.0);
        assert_eq!(jaccard(&["a", "b"], &["a", "b"]), 1.0);
        assert_eq!(jaccard(&["a", "b"], &["b", "c"]), 1.0 / 3.0);
        assert_eq!(jaccard(&["a", ""], &["a"]), 1.0);
    }

    #[test]
    fn levenshtein_counts_chars() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("Contact", "Contact Us"), 3);
        assert_eq!(levenshtein("héllo", "hello"), 1);
    }

    #[test]
    fn text_similarity_bounds() {
        assert_eq!(text_similarity("", "x"), 0.0);
        assert_eq!(text_similarity("same", "same"), 1.0);
        assert!((text_similarity("Contact", "Contact Us") - 0.7).abs() < 1e-9);
    }

    #[test]
    fn ancestor_overlap_prefers_ids() {
        let a = [step("nav", &["x"]), step("", &["row", "wide"])];
        let b = [step("nav", &["y"]), step("", &["row"])];
        assert!((ancestor_overlap(&a, &b) - 0.75).abs() < 1e-9);
        assert_eq!(ancestor_overlap(&a, &[]), 0.0);
    }
}
