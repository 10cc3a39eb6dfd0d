//! Shortest-path stitching
//!
//! Walks the observation pairwise and, wherever the end node of one observed
//! segment differs from the start node of the next, bridges the two with the
//! segments of a shortest node route. A pair that cannot be bridged is left
//! as a gap and reported.

use super::DecodeFailure;
use crate::graph::NetworkTopology;
use crate::types::{Path, SegmentId};

/// A stitched path and the gaps that could not be bridged
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stitched {
    pub path: Path,
    pub gaps: Vec<DecodeFailure>,
}

pub(crate) fn stitch<G: NetworkTopology + ?Sized>(graph: &G, sparse: &[SegmentId]) -> Stitched {
    let mut path = Vec::with_capacity(sparse.len());
    let mut gaps = Vec::new();

    for (i, &segment) in sparse.iter().enumerate() {
        if i > 0 {
            let previous = sparse[i - 1];
            if let (Some((_, from)), Some((to, _))) =
                (graph.incident_nodes(previous), graph.incident_nodes(segment))
            {
                if from != to {
                    match graph.shortest_node_path(from, to) {
                        Some(nodes) => path.extend(
                            nodes
                                .windows(2)
                                .filter_map(|pair| graph.segment_between(pair[0], pair[1])),
                        ),
                        None => {
                            tracing::debug!(from, to, "no route between observations");
                            gaps.push(DecodeFailure::FallbackUnavailable {
                                from_node: from,
                                to_node: to,
                            });
                        }
                    }
                }
            }
        }
        path.push(segment);
    }

    Stitched { path, gaps }
}
