//! Graph of all potential links, used to look for alternate paths during reconfiguration.

use std::collections::BTreeMap;

use crate::edge::Edge;
use crate::node::NodeId;
use crate::routing::{self, Path};

/// Parameters of a link that can be instantiated in the live topology.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostLink {
    pub capacity: usize,
    pub weight: f64,
}

impl GhostLink {
    pub fn to_edge(&self) -> Edge {
        Edge::new(self.capacity, self.weight)
    }
}

/// Every declared link, active or not, with its configured weight.
///
/// The live state of the topology (saturation, disabled edges) is ignored here.
#[derive(Clone, Debug, Default)]
pub struct GhostTopology {
    links: BTreeMap<NodeId, BTreeMap<NodeId, GhostLink>>,
}

impl GhostTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a potential link, a repeated pair keeps the first parameters.
    pub fn add_link(&mut self, node1: NodeId, node2: NodeId, capacity: usize, weight: f64) {
        self.links
            .entry(node1)
            .or_default()
            .entry(node2)
            .or_insert(GhostLink { capacity, weight });
    }

    pub fn link(&self, node1: NodeId, node2: NodeId) -> Option<&GhostLink> {
        self.links.get(&node1).and_then(|n| n.get(&node2))
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(|n| n.len()).sum()
    }

    pub fn shortest_path(&self, src: NodeId, dst: NodeId) -> Option<Path> {
        routing::shortest_path(src, dst, |n| self.neighbors(n, None))
    }

    /// Shortest path from `src` to `dst` which does not use the direct link between them.
    pub fn alternate_path(&self, src: NodeId, dst: NodeId) -> Option<Path> {
        routing::shortest_path(src, dst, |n| self.neighbors(n, Some((src, dst))))
    }

    fn neighbors(&self, node: NodeId, skip: Option<(NodeId, NodeId)>) -> Vec<(NodeId, f64)> {
        self.links
            .get(&node)
            .map(|n| {
                n.iter()
                    .filter(|(to, _)| skip != Some((node, **to)))
                    .map(|(to, link)| (*to, link.weight))
                    .collect()
            })
            .unwrap_or_default()
    }
}
