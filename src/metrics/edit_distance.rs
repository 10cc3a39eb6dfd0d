use crate::types::SegmentId;

/// Levenshtein distance over segment sequences (unit insert, delete and
/// substitute costs)
pub fn levenshtein_distance(a: &[SegmentId], b: &[SegmentId]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // single rolling row over `b`
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &x) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &y) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(x != y);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// Edit distance divided by the reference length, capped at 1.
///
/// An empty reference always scores the worst case 1.
pub fn normalized_edit_distance(reference: &[SegmentId], predicted: &[SegmentId]) -> f64 {
    let distance = levenshtein_distance(reference, predicted) as f64;
    (distance / reference.len() as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance(&[5, 6, 7], &[5, 7]), 1);
        assert_eq!(levenshtein_distance(&[5, 7], &[5, 6, 7]), 1);
        assert_eq!(levenshtein_distance(&[1, 2, 3], &[1, 2, 3]), 0);
        assert_eq!(levenshtein_distance(&[1, 2, 3], &[3, 2, 1]), 2);
        assert_eq!(levenshtein_distance(&[], &[4, 4]), 2);
        assert_eq!(levenshtein_distance(&[9], &[]), 1);
    }

    #[test]
    fn test_normalized() {
        assert!((normalized_edit_distance(&[5, 6, 7], &[5, 7]) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(normalized_edit_distance(&[1], &[2, 3, 4, 5]), 1.0);
        assert_eq!(normalized_edit_distance(&[], &[]), 1.0);
        assert_eq!(normalized_edit_distance(&[], &[1]), 1.0);
    }
}
