//! Node-level shortest path searches over a [`RoadNetwork`]
//!
//! Both searches expand a node's outgoing segments in adjacency order, so
//! among equal-cost routes the one reached first is returned.

use super::builder::RoadNetwork;
use crate::types::NodeId;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Route with the fewest segments (breadth-first search)
pub fn fewest_hops(network: &RoadNetwork, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
    if from == to {
        return Some(vec![from]);
    }

    let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut queue = VecDeque::new();
    parent.insert(from, from);
    queue.push_back(from);

    while let Some(node) = queue.pop_front() {
        for &seg in network.outgoing(node) {
            let Some(segment) = network.segment(seg) else {
                continue;
            };
            let next = segment.end;
            if parent.contains_key(&next) {
                continue;
            }
            parent.insert(next, node);
            if next == to {
                return Some(unwind(&parent, from, to));
            }
            queue.push_back(next);
        }
    }

    None
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    cost: f64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Route with the smallest total segment length (Dijkstra)
pub fn shortest_by_length(network: &RoadNetwork, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
    if from == to {
        return Some(vec![from]);
    }

    let mut dist: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    dist.insert(from, 0.0);
    parent.insert(from, from);
    heap.push(HeapEntry {
        cost: 0.0,
        node: from,
    });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if node == to {
            return Some(unwind(&parent, from, to));
        }
        if dist.get(&node).is_some_and(|&d| cost > d) {
            continue; // stale entry
        }
        for &seg in network.outgoing(node) {
            let Some(segment) = network.segment(seg) else {
                continue;
            };
            let next_cost = cost + segment.length;
            let better = dist.get(&segment.end).map_or(true, |&d| next_cost < d);
            if better {
                dist.insert(segment.end, next_cost);
                parent.insert(segment.end, node);
                heap.push(HeapEntry {
                    cost: next_cost,
                    node: segment.end,
                });
            }
        }
    }

    None
}

fn unwind(parent: &FxHashMap<NodeId, NodeId>, from: NodeId, to: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![to];
    let mut current = to;
    while current != from {
        current = parent[&current];
        nodes.push(current);
    }
    nodes.reverse();
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::NetworkBuilder;
    use crate::graph::{NetworkTopology, RouteMetric};

    /// Two routes from 0 to 3: 0→1→3 (short hops, long) and 0→2→4→3 (more hops, short).
    fn diamond(metric: RouteMetric) -> RoadNetwork {
        let mut builder = NetworkBuilder::new().with_route_metric(metric);
        builder.add_segment(0, 1, 10.0);
        builder.add_segment(1, 3, 10.0);
        builder.add_segment(0, 2, 1.0);
        builder.add_segment(2, 4, 1.0);
        builder.add_segment(4, 3, 1.0);
        builder.build().unwrap()
    }

    #[test]
    fn test_fewest_hops() {
        let network = diamond(RouteMetric::Hops);
        assert_eq!(fewest_hops(&network, 0, 3), Some(vec![0, 1, 3]));
        assert_eq!(network.shortest_node_path(0, 3), Some(vec![0, 1, 3]));
    }

    #[test]
    fn test_shortest_by_length() {
        let network = diamond(RouteMetric::Length);
        assert_eq!(shortest_by_length(&network, 0, 3), Some(vec![0, 2, 4, 3]));
        assert_eq!(network.shortest_node_path(0, 3), Some(vec![0, 2, 4, 3]));
    }

    #[test]
    fn test_same_node() {
        let network = diamond(RouteMetric::Hops);
        assert_eq!(fewest_hops(&network, 2, 2), Some(vec![2]));
        assert_eq!(shortest_by_length(&network, 2, 2), Some(vec![2]));
    }

    #[test]
    fn test_disconnected() {
        let network = diamond(RouteMetric::Hops);
        // edges are directed: nothing leaves node 3
        assert_eq!(fewest_hops(&network, 3, 0), None);
        assert_eq!(shortest_by_length(&network, 3, 0), None);
        assert_eq!(fewest_hops(&network, 0, 77), None);
    }
}
