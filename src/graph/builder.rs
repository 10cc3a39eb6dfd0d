//! Network builder and in-memory road network
//!
//! Segments are added one at a time and receive dense ids. Building derives
//! the segment-level adjacency from node incidence: segment `u→v` is followed
//! by every segment leaving `v` and preceded by every segment entering `u`.

use super::shortest_path::{fewest_hops, shortest_by_length};
use super::{AdjacencyOrder, NetworkTopology, RouteMetric};
use crate::dataset::AdjacencyMap;
use crate::errors::{InferenceError, Result};
use crate::types::{NodeId, SegmentId};
use rustc_hash::FxHashMap;

/// A directed segment between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Dense segment id
    pub id: SegmentId,
    /// Node the segment leaves from
    pub start: NodeId,
    /// Node the segment arrives at
    pub end: NodeId,
    /// Physical length
    pub length: f64,
}

/// A mutable builder for [`RoadNetwork`]
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    segments: Vec<Segment>,
    adjacency_order: AdjacencyOrder,
    route_metric: RouteMetric,
}

impl NetworkBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with pre-allocated capacity
    pub fn with_capacity(segment_capacity: usize) -> Self {
        Self {
            segments: Vec::with_capacity(segment_capacity),
            ..Self::default()
        }
    }

    /// Builder method: set adjacency list ordering
    pub fn with_adjacency_order(mut self, order: AdjacencyOrder) -> Self {
        self.adjacency_order = order;
        self
    }

    /// Builder method: set the shortest-path cost
    pub fn with_route_metric(mut self, metric: RouteMetric) -> Self {
        self.route_metric = metric;
        self
    }

    /// Add a directed segment, returning its id
    pub fn add_segment(&mut self, start: NodeId, end: NodeId, length: f64) -> SegmentId {
        let id = self.segments.len() as SegmentId;
        self.segments.push(Segment {
            id,
            start,
            end,
            length,
        });
        id
    }

    /// Number of segments added so far
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Check if no segment has been added
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Derive adjacency and freeze the network
    pub fn build(self) -> Result<RoadNetwork> {
        if let Some(bad) = self
            .segments
            .iter()
            .find(|s| !s.length.is_finite() || s.length < 0.0)
        {
            return Err(InferenceError::invalid_config(format!(
                "segment {} has invalid length {}",
                bad.id, bad.length
            )));
        }

        let mut outgoing: FxHashMap<NodeId, Vec<SegmentId>> = FxHashMap::default();
        let mut incoming: FxHashMap<NodeId, Vec<SegmentId>> = FxHashMap::default();
        let mut node_pairs: FxHashMap<(NodeId, NodeId), SegmentId> = FxHashMap::default();

        for segment in &self.segments {
            outgoing.entry(segment.start).or_default().push(segment.id);
            incoming.entry(segment.end).or_default().push(segment.id);
            // ids ascend, so the first writer is the lowest id
            node_pairs
                .entry((segment.start, segment.end))
                .or_insert(segment.id);
        }

        let empty = Vec::new();
        let downstream = self
            .segments
            .iter()
            .map(|s| outgoing.get(&s.end).unwrap_or(&empty).clone())
            .collect();
        let upstream = self
            .segments
            .iter()
            .map(|s| incoming.get(&s.start).unwrap_or(&empty).clone())
            .collect();

        let mut network = RoadNetwork {
            segments: self.segments,
            downstream,
            upstream,
            outgoing,
            node_pairs,
            adjacency_order: self.adjacency_order,
            route_metric: self.route_metric,
        };
        network.apply_order();
        Ok(network)
    }
}

/// Immutable road network implementing [`NetworkTopology`]
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    segments: Vec<Segment>,
    downstream: Vec<Vec<SegmentId>>,
    upstream: Vec<Vec<SegmentId>>,
    outgoing: FxHashMap<NodeId, Vec<SegmentId>>,
    node_pairs: FxHashMap<(NodeId, NodeId), SegmentId>,
    adjacency_order: AdjacencyOrder,
    route_metric: RouteMetric,
}

impl RoadNetwork {
    /// Build a network from `(start, end, length)` triples
    pub fn from_segments(segments: &[(NodeId, NodeId, f64)]) -> Result<Self> {
        let mut builder = NetworkBuilder::with_capacity(segments.len());
        for &(start, end, length) in segments {
            builder.add_segment(start, end, length);
        }
        builder.build()
    }

    /// Get a segment by id
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id as usize)
    }

    /// Iterate over all segments
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Segments leaving a node
    pub fn outgoing(&self, node: NodeId) -> &[SegmentId] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct nodes touched by segments
    pub fn node_count(&self) -> usize {
        let mut nodes: Vec<NodeId> = self
            .segments
            .iter()
            .flat_map(|s| [s.start, s.end])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes.len()
    }

    /// The configured shortest-path cost
    pub fn route_metric(&self) -> RouteMetric {
        self.route_metric
    }

    /// Replace the downstream adjacency of one segment.
    ///
    /// Used when a recorded adjacency map disagrees with node incidence
    /// (for example turn restrictions).
    pub fn set_downstream(&mut self, segment: SegmentId, neighbors: Vec<SegmentId>) -> Result<()> {
        self.check_segment(segment)?;
        for &n in &neighbors {
            self.check_segment(n)?;
        }
        self.downstream[segment as usize] = neighbors;
        if self.adjacency_order == AdjacencyOrder::SortedById {
            self.downstream[segment as usize].sort_unstable();
        }
        Ok(())
    }

    /// Replace the downstream adjacency of every segment listed in `map`
    pub fn apply_downstream_map(&mut self, map: &AdjacencyMap) -> Result<()> {
        for (&segment, neighbors) in map.iter() {
            self.set_downstream(segment, neighbors.clone())?;
        }
        Ok(())
    }

    /// Export the downstream adjacency as a persisted map
    pub fn downstream_map(&self) -> AdjacencyMap {
        self.downstream
            .iter()
            .enumerate()
            .map(|(id, n)| (id as SegmentId, n.clone()))
            .collect()
    }

    /// Export the upstream adjacency as a persisted map
    pub fn upstream_map(&self) -> AdjacencyMap {
        self.upstream
            .iter()
            .enumerate()
            .map(|(id, n)| (id as SegmentId, n.clone()))
            .collect()
    }

    fn check_segment(&self, segment: SegmentId) -> Result<()> {
        if (segment as usize) < self.segments.len() {
            Ok(())
        } else {
            Err(InferenceError::UnknownSegment { segment })
        }
    }

    fn apply_order(&mut self) {
        if self.adjacency_order == AdjacencyOrder::SortedById {
            for list in self.downstream.iter_mut().chain(self.upstream.iter_mut()) {
                list.sort_unstable();
            }
            for list in self.outgoing.values_mut() {
                list.sort_unstable();
            }
        }
    }
}

impl NetworkTopology for RoadNetwork {
    fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn downstream(&self, segment: SegmentId) -> &[SegmentId] {
        self.downstream
            .get(segment as usize)
            .map(Vec::as_slice).unwrap_or(&[])
    }

    fn upstream(&self, segment: SegmentId) -> &[SegmentId] {
        self.upstream
            .get(segment as usize)
            .map(Vec::as_slice).unwrap_or(&[])
    }

    fn incident_nodes(&self, segment: SegmentId) -> Option<(NodeId, NodeId)> {
        self.segment(segment).map(|s| (s.start, s.end))
    }

    fn length(&self, segment: SegmentId) -> Option<f64> {
        self.segment(segment).map(|s| s.length)
    }

    fn shortest_node_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        match self.route_metric {
            RouteMetric::Hops => fewest_hops(self, from, to),
            RouteMetric::Length => shortest_by_length(self, from, to),
        }
    }

    fn segment_between(&self, from: NodeId, to: NodeId) -> Option<SegmentId> {
        self.node_pairs.get(&(from, to)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0:0→1, 1:1→2, 2:2→3, 3:3→0
    fn cycle() -> RoadNetwork {
        RoadNetwork::from_segments(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)]).unwrap()
    }

    #[test]
    fn test_builder_assigns_dense_ids() {
        let mut builder = NetworkBuilder::new();
        assert_eq!(builder.add_segment(10, 11, 2.0), 0);
        assert_eq!(builder.add_segment(11, 12, 3.0), 1);
        assert_eq!(builder.segment_count(), 2);

        let network = builder.build().unwrap();
        assert_eq!(network.num_segments(), 2);
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.incident_nodes(1), Some((11, 12)));
        assert_eq!(network.length(0), Some(2.0));
    }

    #[test]
    fn test_adjacency_from_node_incidence() {
        let network = cycle();
        assert_eq!(network.downstream(0), &[1]);
        assert_eq!(network.downstream(3), &[0]);
        assert_eq!(network.upstream(0), &[3]);
        assert!(network.is_adjacent(2, 3));
        assert!(!network.is_adjacent(0, 2));
    }

    #[test]
    fn test_unknown_segment_has_no_neighbors() {
        let network = cycle();
        assert!(network.downstream(99).is_empty());
        assert!(network.upstream(99).is_empty());
        assert_eq!(network.incident_nodes(99), None);
        assert_eq!(network.length(99), None);
    }

    #[test]
    fn test_set_downstream_override() {
        let mut network = cycle();
        network.set_downstream(2, Vec::new()).unwrap();
        assert!(network.downstream(2).is_empty());
        assert!(network.set_downstream(2, vec![42]).is_err());
        assert!(network.set_downstream(42, vec![0]).is_err());
    }

    #[test]
    fn test_adjacency_order_sorted() {
        let segments = [(0, 1, 1.0), (1, 4, 1.0), (1, 3, 1.0), (5, 1, 1.0)];

        let recorded = RoadNetwork::from_segments(&[
            segments[0],
            (9, 9, 1.0),
            segments[2],
            segments[1],
        ])
        .unwrap();
        assert_eq!(recorded.downstream(0), &[2, 3]);

        let mut builder = NetworkBuilder::new().with_adjacency_order(AdjacencyOrder::SortedById);
        for &(start, end, length) in &segments {
            builder.add_segment(start, end, length);
        }
        let mut sorted = builder.build().unwrap();
        assert_eq!(sorted.downstream(0), &[1, 2]);
        assert_eq!(sorted.upstream(1), &[0, 3]);

        sorted.set_downstream(3, vec![2, 1]).unwrap();
        assert_eq!(sorted.downstream(3), &[1, 2]);

        let mut recorded = recorded;
        recorded.set_downstream(0, vec![3, 2]).unwrap();
        assert_eq!(recorded.downstream(0), &[3, 2]);
    }

    #[test]
    fn test_invalid_length_rejected() {
        assert!(RoadNetwork::from_segments(&[(0, 1, -1.0)]).is_err());
        assert!(RoadNetwork::from_segments(&[(0, 1, f64::NAN)]).is_err());
    }

    #[test]
    fn test_segment_between_prefers_lowest_id() {
        let network =
            RoadNetwork::from_segments(&[(0, 1, 5.0), (0, 1, 1.0), (1, 2, 1.0)]).unwrap();
        assert_eq!(network.segment_between(0, 1), Some(0));
        assert_eq!(network.segment_between(1, 0), None);
    }

    #[test]
    fn test_adjacency_map_roundtrip() {
        let mut network = cycle();
        let map = network.downstream_map();
        assert_eq!(map.get(&1), Some(&vec![2]));

        let mut edited = map.clone();
        edited.insert(1, vec![3]);
        network.apply_downstream_map(&edited).unwrap();
        assert_eq!(network.downstream(1), &[3]);
        assert_eq!(network.upstream_map().get(&0), Some(&vec![3]));
    }
}
