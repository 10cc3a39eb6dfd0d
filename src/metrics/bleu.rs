//! Sentence-level BLEU restricted to unigrams
//!
//! Clipped unigram precision times the brevity penalty, matching standard
//! sentence BLEU with weights `(1, 0, 0, 0)` and a single reference.

use crate::types::SegmentId;
use rustc_hash::FxHashMap;

/// Unigram BLEU of `hypothesis` against one `reference`.
///
/// Zero when the hypothesis is empty or shares no segment with the
/// reference.
pub fn bleu1(reference: &[SegmentId], hypothesis: &[SegmentId]) -> f64 {
    if hypothesis.is_empty() {
        return 0.0;
    }

    let mut reference_counts: FxHashMap<SegmentId, usize> = FxHashMap::default();
    for &segment in reference {
        *reference_counts.entry(segment).or_insert(0) += 1;
    }
    let mut hypothesis_counts: FxHashMap<SegmentId, usize> = FxHashMap::default();
    for &segment in hypothesis {
        *hypothesis_counts.entry(segment).or_insert(0) += 1;
    }

    let clipped: usize = hypothesis_counts
        .iter()
        .map(|(segment, &count)| count.min(reference_counts.get(segment).copied().unwrap_or(0)))
        .sum();
    if clipped == 0 {
        return 0.0;
    }

    let precision = clipped as f64 / hypothesis.len() as f64;
    precision * brevity_penalty(reference.len(), hypothesis.len())
}

fn brevity_penalty(reference_len: usize, hypothesis_len: usize) -> f64 {
    if hypothesis_len > reference_len {
        1.0
    } else {
        (1.0 - reference_len as f64 / hypothesis_len as f64).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert!((bleu1(&[5, 6, 7], &[5, 6, 7]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_hypothesis_penalized() {
        // precision 1, brevity penalty exp(1 - 3/2)
        let expected = (-0.5f64).exp();
        assert!((bleu1(&[5, 6, 7], &[5, 7]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_clipping() {
        // 2 of 4 hypothesis tokens count (one 1 and one 2), no penalty at equal length
        assert!((bleu1(&[1, 2, 3, 4], &[1, 1, 1, 2]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_long_hypothesis_not_penalized() {
        assert!((bleu1(&[1, 2], &[1, 2, 3, 4]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(bleu1(&[1, 2], &[]), 0.0);
        assert_eq!(bleu1(&[1, 2], &[3, 4]), 0.0);
        assert_eq!(bleu1(&[], &[3]), 0.0);
    }
}
