//! Road network representation
//!
//! - [`NetworkTopology`]: the read-only adjacency contract the encoder,
//!   decoder and metrics consume.
//! - [`builder`]: [`RoadNetwork`](builder::RoadNetwork), the in-memory
//!   implementation, and its [`NetworkBuilder`](builder::NetworkBuilder).
//! - [`shortest_path`]: node-level shortest path searches used by the
//!   stitching fallback.
//! - [`synthetic`]: grid networks and random walks for experiments and tests.

pub mod builder;
pub mod shortest_path;
pub mod synthetic;

use crate::types::{NodeId, SegmentId};
use serde::{Deserialize, Serialize};

/// Read-only view of a directed road network.
///
/// Lookups never fail loudly: unknown segments have no neighbors and no
/// incident nodes, and a disconnected shortest-path query returns `None`.
/// Implementations must be `Sync` to be shared across batch workers.
pub trait NetworkTopology {
    /// Number of segments; segment ids are `0..num_segments()`
    fn num_segments(&self) -> usize;

    /// Segments that can directly follow `segment`
    fn downstream(&self, segment: SegmentId) -> &[SegmentId];

    /// Segments that can directly precede `segment`
    fn upstream(&self, segment: SegmentId) -> &[SegmentId];

    /// `(start_node, end_node)` of a segment
    fn incident_nodes(&self, segment: SegmentId) -> Option<(NodeId, NodeId)>;

    /// Length of a segment
    fn length(&self, segment: SegmentId) -> Option<f64>;

    /// Node sequence of a shortest route from `from` to `to`, inclusive
    fn shortest_node_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>>;

    /// Segment joining two nodes (lowest id when several exist)
    fn segment_between(&self, from: NodeId, to: NodeId) -> Option<SegmentId>;

    /// Whether `next` may directly follow `segment`
    fn is_adjacent(&self, segment: SegmentId, next: SegmentId) -> bool {
        self.downstream(segment).contains(&next)
    }
}

/// Order of each segment's adjacency list.
///
/// The decoder breaks probability ties by adjacency order, so this choice
/// fixes reproducibility of decoded paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyOrder {
    /// Order in which segments were added to the network (or given in an
    /// adjacency map).
    #[default]
    AsRecorded,
    /// Ascending segment id.
    SortedById,
}

/// Cost minimized by [`NetworkTopology::shortest_node_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMetric {
    /// Fewest segments (breadth-first search).
    #[default]
    Hops,
    /// Smallest total segment length (Dijkstra).
    Length,
}
