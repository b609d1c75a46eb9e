//! Shortest path search.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::node::NodeId;

/// Path found by the routing algorithm.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    /// Visited nodes, from the source to the destination.
    pub nodes: Vec<NodeId>,
    /// Sum of edge weights along the path.
    pub cost: f64,
}

impl Path {
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Consecutive node pairs of the path.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Dijkstra's algorithm over the graph described by `neighbors`.
///
/// `neighbors(node)` yields `(next node, edge weight)` pairs. Edges with infinite weight are never
/// traversed, so `None` is returned when the destination is reachable only through them.
/// Among paths of equal cost the one found first wins: nodes with equal distance are settled in
/// ascending id order, and a distance is only replaced by a strictly smaller one, so the result
/// depends only on the graph state.
pub fn shortest_path<F, I>(src: NodeId, dst: NodeId, mut neighbors: F) -> Option<Path>
where
    F: FnMut(NodeId) -> I,
    I: IntoIterator<Item = (NodeId, f64)>,
{
    let mut distance: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut queue = BinaryHeap::new();

    distance.insert(src, 0.);
    queue.push(Reverse((OrderedFloat(0.), src)));

    while let Some(Reverse((OrderedFloat(dist), node))) = queue.pop() {
        if dist > distance[&node] {
            continue;
        }
        if node == dst {
            break;
        }
        for (next, weight) in neighbors(node) {
            if !weight.is_finite() {
                continue;
            }
            let candidate = dist + weight;
            if distance.get(&next).map_or(true, |d| candidate < *d) {
                distance.insert(next, candidate);
                parent.insert(next, node);
                queue.push(Reverse((OrderedFloat(candidate), next)));
            }
        }
    }

    let cost = *distance.get(&dst)?;
    let mut nodes = vec![dst];
    let mut cur = dst;
    while cur != src {
        cur = parent[&cur];
        nodes.push(cur);
    }
    nodes.reverse();
    Some(Path { nodes, cost })
}
