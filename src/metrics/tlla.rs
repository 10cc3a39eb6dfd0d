use crate::graph::NetworkTopology;
use crate::types::SegmentId;
use rustc_hash::FxHashSet;

/// Total link-length accuracy of one predicted path.
///
/// Sums the lengths of the distinct predicted segments that appear in the
/// reference and divides by the reference length (repeated reference
/// segments count every time). Segments with no recorded length count as 0.
/// A zero-length reference yields NaN.
pub fn tlla<G>(graph: &G, reference: &[SegmentId], predicted: &[SegmentId]) -> f64
where
    G: NetworkTopology + ?Sized,
{
    let length = |segment: SegmentId| graph.length(segment).unwrap_or(0.0);

    let reference_length: f64 = reference.iter().map(|&s| length(s)).sum();
    if reference_length == 0.0 {
        return f64::NAN;
    }

    let in_reference: FxHashSet<SegmentId> = reference.iter().copied().collect();
    let distinct: FxHashSet<SegmentId> = predicted.iter().copied().collect();
    let matched: f64 = distinct
        .into_iter()
        .filter(|s| in_reference.contains(s))
        .map(length)
        .sum();

    matched / reference_length
}
