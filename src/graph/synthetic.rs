//! Synthetic grid networks and random-walk paths
//!
//! Used for quick experiments, property tests and benchmarks when no real
//! network is at hand.

use super::builder::{NetworkBuilder, RoadNetwork};
use super::NetworkTopology;
use crate::dataset::PathDictionary;
use crate::errors::{InferenceError, Result};
use crate::types::{NodeId, Path, SegmentId};
use rand::seq::SliceRandom;
use rand::Rng;

/// Number of recently visited segments a walk tries not to revisit
const LOOP_GUARD: usize = 3;

/// Walk attempts before settling for a short path
const MAX_ATTEMPTS: usize = 100;

/// Build a directed `rows x cols` grid.
///
/// Node `i * cols + j` sits at `(j, i)` jittered by up to `perturbation` on
/// each axis. Every node emits its right, down, left and up segments in that
/// order, so segment ids follow a row-major sweep. Segment length is the
/// Euclidean distance between the jittered endpoints.
pub fn grid_network<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    perturbation: f64,
    rng: &mut R,
) -> Result<RoadNetwork> {
    if rows == 0 || cols == 0 {
        return Err(InferenceError::invalid_config(format!(
            "grid must have at least one row and column, got {rows}x{cols}"
        )));
    }
    if !perturbation.is_finite() || perturbation < 0.0 {
        return Err(InferenceError::invalid_config(format!(
            "perturbation must be finite and non-negative, got {perturbation}"
        )));
    }

    let jitter = |rng: &mut R| {
        if perturbation > 0.0 {
            rng.gen_range(-perturbation..perturbation)
        } else {
            0.0
        }
    };

    let mut positions = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            let x = j as f64 + jitter(rng);
            let y = i as f64 + jitter(rng);
            positions.push((x, y));
        }
    }

    let distance = |a: usize, b: usize| {
        let (ax, ay) = positions[a];
        let (bx, by) = positions[b];
        (ax - bx).hypot(ay - by)
    };

    let mut builder = NetworkBuilder::with_capacity(4 * rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            let current = i * cols + j;
            let mut neighbors = Vec::with_capacity(4);
            if j + 1 < cols {
                neighbors.push(current + 1);
            }
            if i + 1 < rows {
                neighbors.push(current + cols);
            }
            if j > 0 {
                neighbors.push(current - 1);
            }
            if i > 0 {
                neighbors.push(current - cols);
            }
            for next in neighbors {
                builder.add_segment(current as NodeId, next as NodeId, distance(current, next));
            }
        }
    }

    builder.build()
}

/// Random walk over downstream adjacency.
///
/// Starts on a uniformly chosen segment and aims for a length drawn from
/// `min_len..=max_len`, preferring neighbors outside the last few visited
/// segments. Retries up to a fixed number of times when a walk dead-ends
/// short of `min_len`; if every attempt falls short the last walk is
/// returned as-is.
pub fn random_path<G, R>(network: &G, min_len: usize, max_len: usize, rng: &mut R) -> Result<Path>
where
    G: NetworkTopology + ?Sized,
    R: Rng + ?Sized,
{
    let num_segments = network.num_segments();
    if num_segments == 0 {
        return Err(InferenceError::empty_input("network has no segments"));
    }
    if min_len == 0 || min_len > max_len {
        return Err(InferenceError::invalid_config(format!(
            "path length range must satisfy 1 <= min <= max, got {min_len}..={max_len}"
        )));
    }

    let mut path = Vec::new();
    for _ in 0..MAX_ATTEMPTS {
        let mut current = rng.gen_range(0..num_segments) as SegmentId;
        path = vec![current];
        let target = rng.gen_range(min_len..=max_len);

        while path.len() < target {
            let neighbors = network.downstream(current);
            if neighbors.is_empty() {
                break;
            }
            let recent = &path[path.len().saturating_sub(LOOP_GUARD)..];
            let fresh: Vec<SegmentId> = neighbors
                .iter()
                .copied()
                .filter(|n| !recent.contains(n))
                .collect();
            let pool = if fresh.is_empty() { neighbors } else { &fresh[..] };
            let Some(&next) = pool.choose(rng) else {
                break;
            };
            path.push(next);
            current = next;
        }

        if path.len() >= min_len {
            break;
        }
    }

    Ok(path)
}

/// Generate `count` random paths keyed `0..count`
pub fn random_path_dataset<G, R>(
    network: &G,
    count: usize,
    min_len: usize,
    max_len: usize,
    rng: &mut R,
) -> Result<PathDictionary>
where
    G: NetworkTopology + ?Sized,
    R: Rng + ?Sized,
{
    let mut dataset = PathDictionary::new();
    for idx in 0..count {
        dataset.insert(idx, random_path(network, min_len, max_len, rng)?);
    }
    tracing::debug!(
        paths = count,
        mean_len = dataset.mean_path_len(),
        "generated random path dataset"
    );
    Ok(dataset)
}
