//! Observation simulation
//!
//! Sparse observations come from two sources: random masking of a
//! ground-truth path (used to build training data) and fixed roadside
//! detectors that see only the segments they are installed on (used for
//! evaluation). Both always keep the origin and destination segments.

use crate::dataset::{PathDictionary, SparseDictionary};
use crate::errors::{InferenceError, Result};
use crate::types::{MaskRatio, Path, SegmentId};
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;

/// A sparse observation together with the ground-truth position of each
/// kept segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseObservation {
    pub segments: Path,
    pub gt_indices: Vec<usize>,
}

impl SparseObservation {
    fn from_positions(path: &[SegmentId], positions: Vec<usize>) -> Self {
        Self {
            segments: positions.iter().map(|&i| path[i]).collect(),
            gt_indices: positions,
        }
    }
}

/// Thin a ground-truth path according to a mask ratio.
///
/// `OriginDestination` keeps the first and last segments. `Ratio(r)` keeps
/// them plus every position among the first `max(0, floor((1 - r) * len) - 2)`
/// entries of a random permutation of the positions.
pub fn discontinuous_path<R: Rng + ?Sized>(
    path: &[SegmentId],
    ratio: MaskRatio,
    rng: &mut R,
) -> Result<SparseObservation> {
    let len = path.len();
    if len == 0 {
        return Err(InferenceError::empty_input("cannot mask an empty path"));
    }
    let last = len - 1;

    let positions = match ratio {
        MaskRatio::OriginDestination if last == 0 => vec![0],
        MaskRatio::OriginDestination => vec![0, last],
        MaskRatio::Ratio(r) => {
            let link_num = (((1.0 - r) * len as f64).floor() as i64 - 2).max(0) as usize;
            let mut permutation: Vec<usize> = (0..len).collect();
            permutation.shuffle(rng);
            let kept: FxHashSet<usize> = permutation.into_iter().take(link_num).collect();
            (0..len)
                .filter(|i| *i == 0 || *i == last || kept.contains(i))
                .collect()
        }
    };

    Ok(SparseObservation::from_positions(path, positions))
}

/// Mask every requested path with the same ratio
pub fn training_observations<R: Rng + ?Sized>(
    ground_truth: &PathDictionary,
    ratio: MaskRatio,
    idxs: &[usize],
    rng: &mut R,
) -> Result<SparseDictionary> {
    let mut sparse = SparseDictionary::new();
    for &idx in idxs {
        let path = ground_truth
            .get(idx)
            .ok_or(InferenceError::MissingPath { index: idx })?;
        let observation = discontinuous_path(path, ratio, rng)?;
        sparse.insert_aligned(idx, observation.segments, observation.gt_indices);
    }
    Ok(sparse)
}

/// Pick `floor(coverage * num_segments)` distinct segments to carry a detector
pub fn deploy_detectors<R: Rng + ?Sized>(
    num_segments: usize,
    coverage: f64,
    rng: &mut R,
) -> Result<FxHashSet<SegmentId>> {
    if !(0.0..=1.0).contains(&coverage) {
        return Err(InferenceError::invalid_config(format!(
            "detector coverage must be between 0 and 1, got {coverage}"
        )));
    }
    let count = (coverage * num_segments as f64).floor() as usize;
    let mut ids: Vec<SegmentId> = (0..num_segments as SegmentId).collect();
    ids.shuffle(rng);
    ids.truncate(count);
    tracing::debug!(detectors = count, num_segments, "deployed detectors");
    Ok(ids.into_iter().collect())
}

/// Observe each path through a fixed detector set (origin and destination
/// are always observed)
pub fn detector_observations(
    ground_truth: &PathDictionary,
    detectors: &FxHashSet<SegmentId>,
    idxs: &[usize],
) -> Result<SparseDictionary> {
    let mut sparse = SparseDictionary::new();
    for &idx in idxs {
        let path = ground_truth
            .get(idx)
            .ok_or(InferenceError::MissingPath { index: idx })?;
        let last = path.len().saturating_sub(1);
        let positions: Vec<usize> = path
            .iter()
            .enumerate()
            .filter(|&(i, seg)| i == 0 || i == last || detectors.contains(seg))
            .map(|(i, _)| i)
            .collect();
        let observation = SparseObservation::from_positions(path, positions);
        sparse.insert_aligned(idx, observation.segments, observation.gt_indices);
    }
    Ok(sparse)
}

/// Randomly split path indices into `(train, test)`.
///
/// The training split receives `floor(len * train_ratio)` indices.
pub fn train_test_split<R: Rng + ?Sized>(
    ground_truth: &PathDictionary,
    train_ratio: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..=1.0).contains(&train_ratio) {
        return Err(InferenceError::invalid_config(format!(
            "train ratio must be between 0 and 1, got {train_ratio}"
        )));
    }
    let mut keys: Vec<usize> = ground_truth.keys().collect();
    keys.shuffle(rng);
    let train_len = (keys.len() as f64 * train_ratio).floor() as usize;
    let test = keys.split_off(train_len);
    Ok((keys, test))
}

/// Observed segments over ground-truth segments, pooled across `idxs`
pub fn observation_rate(
    ground_truth: &PathDictionary,
    sparse: &SparseDictionary,
    idxs: &[usize],
) -> f64 {
    let (observed, total) = idxs.iter().fold((0usize, 0usize), |(obs, tot), idx| {
        match (sparse.get(*idx), ground_truth.get(*idx)) {
            (Some(s), Some(g)) => (obs + s.len(), tot + g.len()),
            _ => (obs, tot),
        }
    });
    if total == 0 {
        0.0
    } else {
        observed as f64 / total as f64
    }
}

/// Positions of `sparse` inside `ground_truth`, matched greedily in order.
///
/// Returns `None` when `sparse` is not a subsequence of `ground_truth`.
pub fn align_to_ground_truth(sparse: &[SegmentId], ground_truth: &[SegmentId]) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(sparse.len());
    let mut cursor = 0;
    for &segment in sparse {
        let offset = ground_truth[cursor..].iter().position(|&g| g == segment)?;
        positions.push(cursor + offset);
        cursor += offset + 1;
    }
    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2024)
    }

    #[test]
    fn test_od_mask() {
        let obs = discontinuous_path(&[5, 6, 7, 8], MaskRatio::OriginDestination, &mut rng()).unwrap();
        assert_eq!(obs.segments, vec![5, 8]);
        assert_eq!(obs.gt_indices, vec![0, 3]);

        let single = discontinuous_path(&[9], MaskRatio::OriginDestination, &mut rng()).unwrap();
        assert_eq!(single.segments, vec![9]);
    }

    #[test]
    fn test_ratio_mask_keeps_endpoints() {
        let path: Path = (10..30).collect();
        let mut rng = rng();
        for r in [0.0, 0.1, 0.5, 0.9, 1.0] {
            let obs = discontinuous_path(&path, MaskRatio::Ratio(r), &mut rng).unwrap();
            assert_eq!(obs.segments.first(), Some(&10));
            assert_eq!(obs.segments.last(), Some(&29));
            assert!(obs.segments.len() <= path.len());
            assert!(obs.gt_indices.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_ratio_mask_keep_count() {
        // r = 0.5 on 20 links: 8 random positions plus both endpoints, at most 10 kept
        let path: Path = (0..20).collect();
        let obs = discontinuous_path(&path, MaskRatio::Ratio(0.5), &mut rng()).unwrap();
        assert!(obs.segments.len() >= 2 && obs.segments.len() <= 10);

        // r = 0.9 on 20 links: floor(2.0) - 2 = 0 random positions
        let obs = discontinuous_path(&path, MaskRatio::Ratio(0.9), &mut rng()).unwrap();
        assert_eq!(obs.segments, vec![0, 19]);
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(discontinuous_path(&[], MaskRatio::Ratio(0.3), &mut rng()).is_err());
    }

    #[test]
    fn test_detectors() {
        let mut rng = rng();
        let detectors = deploy_detectors(50, 0.4, &mut rng).unwrap();
        assert_eq!(detectors.len(), 20);
        assert!(detectors.iter().all(|&d| d < 50));
        assert!(deploy_detectors(50, 1.4, &mut rng).is_err());

        let gt: PathDictionary = vec![(0, vec![1, 2, 3, 4, 5])].into_iter().collect();
        let only_three: FxHashSet<SegmentId> = [3].into_iter().collect();
        let sparse = detector_observations(&gt, &only_three, &[0]).unwrap();
        assert_eq!(sparse.get(0), Some(&vec![1, 3, 5]));
        assert_eq!(sparse.gt_indices(0), Some(&[0, 2, 4][..]));
    }

    #[test]
    fn test_train_test_split_partition() {
        let gt: PathDictionary = (0..10).map(|i| (i, vec![i as SegmentId])).collect();
        let (train, test) = train_test_split(&gt, 0.8, &mut rng()).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_observation_rate() {
        let gt: PathDictionary = vec![(0, vec![1, 2, 3, 4]), (1, vec![5, 6])].into_iter().collect();
        let mut sparse = SparseDictionary::new();
        sparse.insert(0, vec![1, 4]);
        sparse.insert(1, vec![5, 6]);
        assert!((observation_rate(&gt, &sparse, &[0, 1]) - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(observation_rate(&gt, &sparse, &[]), 0.0);
    }

    #[test]
    fn test_align_to_ground_truth() {
        assert_eq!(align_to_ground_truth(&[1, 3], &[1, 2, 3, 1, 3]), Some(vec![0, 2]));
        assert_eq!(align_to_ground_truth(&[3, 1, 3], &[1, 2, 3, 1, 3]), Some(vec![2, 3, 4]));
        assert_eq!(align_to_ground_truth(&[3, 2], &[1, 2, 3]), None);
        assert_eq!(align_to_ground_truth(&[], &[1]), Some(vec![]));
    }
}
