//! Generators of regular topologies.

use std::collections::BTreeSet;

use crate::config::{EdgeRecord, NodeRecord};
use crate::node::{IdAllocator, NodeId};

/// Node and edge records of a generated topology. All edges are bidirectional with default
/// capacity and weight.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedTopology {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GeneratedTopology {
    fn with_nodes(ids: &mut IdAllocator, count: usize) -> (Self, Vec<NodeId>) {
        let node_ids: Vec<NodeId> = (0..count).map(|_| ids.next_id()).collect();
        let topology = Self {
            nodes: node_ids.iter().map(|id| NodeRecord::new(*id)).collect(),
            edges: Vec::new(),
        };
        (topology, node_ids)
    }

    // Links each unordered pair once and skips self-loops, which small tori would produce.
    fn link_all(&mut self, pairs: impl IntoIterator<Item = (NodeId, NodeId)>) {
        let mut seen = BTreeSet::new();
        for (a, b) in pairs {
            if a == b || !seen.insert((a.min(b), a.max(b))) {
                continue;
            }
            self.edges.push(EdgeRecord::new(a, b));
        }
    }
}

/// Nodes connected in a cycle.
pub fn ring(ids: &mut IdAllocator, size: usize) -> GeneratedTopology {
    let (mut topology, nodes) = GeneratedTopology::with_nodes(ids, size);
    topology.link_all((0..size).map(|i| (nodes[i], nodes[(i + 1) % size])));
    topology
}

/// Every pair of nodes connected.
pub fn full_mesh(ids: &mut IdAllocator, size: usize) -> GeneratedTopology {
    let (mut topology, nodes) = GeneratedTopology::with_nodes(ids, size);
    let pairs: Vec<_> = (0..size)
        .flat_map(|i| (i + 1..size).map(move |j| (i, j)))
        .map(|(i, j)| (nodes[i], nodes[j]))
        .collect();
    topology.link_all(pairs);
    topology
}

/// Grid with wrap-around links, each node connected to its four neighbours.
pub fn torus_2d(ids: &mut IdAllocator, width: usize, height: usize) -> GeneratedTopology {
    torus_3d(ids, width, height, 1)
}

/// 3D grid with wrap-around links, each node connected to its six neighbours.
pub fn torus_3d(ids: &mut IdAllocator, x: usize, y: usize, z: usize) -> GeneratedTopology {
    let (mut topology, nodes) = GeneratedTopology::with_nodes(ids, x * y * z);
    let index = |i: usize, j: usize, k: usize| nodes[(k * y + j) * x + i];
    let mut pairs = Vec::new();
    for k in 0..z {
        for j in 0..y {
            for i in 0..x {
                let node = index(i, j, k);
                pairs.push((node, index((i + 1) % x, j, k)));
                pairs.push((node, index(i, (j + 1) % y, k)));
                pairs.push((node, index(i, j, (k + 1) % z)));
            }
        }
    }
    topology.link_all(pairs);
    topology
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring() {
        let mut ids = IdAllocator::new();
        let ring = ring(&mut ids, 4);
        assert_eq!(ring.nodes.len(), 4);
        assert_eq!(ring.edges.len(), 4);
        assert_eq!(ring.edges[3].endpoints, (3, 0));
    }

    #[test]
    fn test_small_shapes_have_no_duplicates() {
        let mut ids = IdAllocator::new();
        assert_eq!(ring(&mut ids, 2).edges.len(), 1);
        assert_eq!(ring(&mut ids, 1).edges.len(), 0);
        assert_eq!(torus_2d(&mut ids, 2, 2).edges.len(), 4);
    }

    #[test]
    fn test_full_mesh_and_tori() {
        let mut ids = IdAllocator::new();
        assert_eq!(full_mesh(&mut ids, 5).edges.len(), 10);
        assert_eq!(torus_2d(&mut ids, 4, 3).edges.len(), 24);
        let torus = torus_3d(&mut ids, 3, 3, 3);
        assert_eq!(torus.nodes.len(), 27);
        assert_eq!(torus.edges.len(), 81);
        assert_eq!(torus.nodes[0].id, 17);
    }
}
