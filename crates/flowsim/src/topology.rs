//! Capacitated network topology.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::edge::{Edge, MetaEdge};
use crate::error::{FlowsimError, Result};
use crate::flow::FlowId;
use crate::node::{Node, NodeId};
use crate::routing::{self, Path};

/// Directed graph of nodes connected by meta-edges.
///
/// Every enabled physical edge `u -> v` holds one transmit slot of `u` and one receive slot of `v`.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, MetaEdge>>,
    // (flow, from, to) hops whose edge was removed while the flow was still on it
    evicted: BTreeSet<(FlowId, NodeId, NodeId)>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id()) {
            return Err(FlowsimError::DuplicatedNode(node.id()));
        }
        debug!(target: "topology", "added node {} ({})", node.id(), node.name());
        self.adjacency.insert(node.id(), BTreeMap::new());
        self.nodes.insert(node.id(), node);
        Ok(())
    }

    /// Adds all nodes or none of them.
    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        let mut ids = BTreeSet::new();
        for node in &nodes {
            if self.nodes.contains_key(&node.id()) || !ids.insert(node.id()) {
                return Err(FlowsimError::DuplicatedNode(node.id()));
            }
        }
        for node in nodes {
            self.add_node(node)?;
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(FlowsimError::NoSuchNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(FlowsimError::NoSuchNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.nodes.values().filter(|n| n.role().is_entry()).map(|n| n.id()).collect()
    }

    pub fn exit_nodes(&self) -> Vec<NodeId> {
        self.nodes.values().filter(|n| n.role().is_exit()).map(|n| n.id()).collect()
    }

    /// Adds a physical edge `node1 -> node2`, a second edge between the same nodes turns the
    /// connection into a meta-edge with two members.
    pub fn add_edge(&mut self, node1: NodeId, node2: NodeId, edge: Edge) -> Result<()> {
        self.check_endpoints(node1, node2)?;
        if edge.capacity() == 0 {
            return Err(FlowsimError::WrongParameter(format!(
                "edge {} -> {} has zero capacity",
                node1, node2
            )));
        }
        if edge.base_weight().is_nan() || edge.base_weight() < 0. {
            return Err(FlowsimError::WrongParameter(format!(
                "edge {} -> {} has invalid weight {}",
                node1,
                node2,
                edge.base_weight()
            )));
        }
        if edge.is_enabled() {
            self.take_slots(node1, node2)?;
        }
        debug!(
            target: "topology",
            "added edge {} -> {} (capacity {}, weight {}, enabled {})",
            node1,
            node2,
            edge.capacity(),
            edge.base_weight(),
            edge.is_enabled()
        );
        let neighbors = self.adjacency.entry(node1).or_default();
        match neighbors.get_mut(&node2) {
            Some(meta) => meta.push(edge),
            None => {
                neighbors.insert(node2, MetaEdge::new(edge));
            }
        }
        Ok(())
    }

    /// Adds every member of `meta_edge` between `node1` and `node2`.
    pub fn add_meta_edge(&mut self, node1: NodeId, node2: NodeId, meta_edge: MetaEdge) -> Result<()> {
        for edge in meta_edge.members() {
            self.add_edge(node1, node2, edge.clone())?;
        }
        Ok(())
    }

    /// Removes the least busy member of the meta-edge `node1 -> node2`.
    ///
    /// An occupied member is only removed if `force` is set: its flows lose this hop and are
    /// returned. The meta-edge disappears together with its last member.
    pub fn remove_edge(&mut self, node1: NodeId, node2: NodeId, force: bool) -> Result<Vec<FlowId>> {
        let meta = self.edge_mut(node1, node2)?;
        let (edge, evicted) = meta.remove_least_busy(force)?;
        let now_empty = meta.is_empty();
        if now_empty {
            if let Some(neighbors) = self.adjacency.get_mut(&node1) {
                neighbors.remove(&node2);
            }
        }
        if edge.is_enabled() {
            self.release_slots(node1, node2);
        }
        for flow in &evicted {
            self.evicted.insert((*flow, node1, node2));
        }
        debug!(
            target: "topology",
            "removed edge {} -> {} (evicted {} flows)",
            node1,
            node2,
            evicted.len()
        );
        Ok(evicted)
    }

    /// Enables a disabled member or disables the least busy enabled member of `node1 -> node2`.
    ///
    /// Returns `false` if there is no member in the opposite state. Enabling takes port slots
    /// on both nodes, disabling an occupied member fails.
    pub fn set_edge_enabled(&mut self, node1: NodeId, node2: NodeId, enabled: bool) -> Result<bool> {
        let meta = self.edge(node1, node2)?;
        if enabled {
            if !meta.has_disabled() {
                return Ok(false);
            }
            self.take_slots(node1, node2)?;
            self.edge_mut(node1, node2)?.enable_one();
        } else {
            if !self.edge_mut(node1, node2)?.disable_one()? {
                return Ok(false);
            }
            self.release_slots(node1, node2);
        }
        debug!(target: "topology", "edge {} -> {} enabled: {}", node1, node2, enabled);
        Ok(true)
    }

    pub fn edge(&self, node1: NodeId, node2: NodeId) -> Result<&MetaEdge> {
        self.adjacency
            .get(&node1)
            .and_then(|n| n.get(&node2))
            .ok_or(FlowsimError::NoSuchEdge(node1, node2))
    }

    fn edge_mut(&mut self, node1: NodeId, node2: NodeId) -> Result<&mut MetaEdge> {
        self.adjacency
            .get_mut(&node1)
            .and_then(|n| n.get_mut(&node2))
            .ok_or(FlowsimError::NoSuchEdge(node1, node2))
    }

    pub fn has_edge(&self, node1: NodeId, node2: NodeId) -> bool {
        self.edge(node1, node2).is_ok()
    }

    /// Returns `true` if `node1 -> node2` has at least one enabled member.
    pub fn is_active(&self, node1: NodeId, node2: NodeId) -> bool {
        self.edge(node1, node2).map_or(false, |e| e.has_enabled())
    }

    /// All meta-edges as `(from, to, meta-edge)`, ordered by node ids.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &MetaEdge)> {
        self.adjacency
            .iter()
            .flat_map(|(from, n)| n.iter().map(move |(to, e)| (*from, *to, e)))
    }

    /// Outgoing meta-edges of the node with their current routing weights.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|n| n.iter().map(|(to, e)| (*to, e.weight())))
    }

    /// Minimum weight path over the edges with spare capacity.
    pub fn shortest_path(&self, src: NodeId, dst: NodeId) -> Result<Path> {
        self.node(src)?;
        self.node(dst)?;
        routing::shortest_path(src, dst, |n| self.neighbors(n).collect::<Vec<_>>())
            .ok_or(FlowsimError::NoPath { src, dst })
    }

    pub fn allocate_flow(&mut self, node1: NodeId, node2: NodeId, flow: FlowId) -> Result<()> {
        self.edge_mut(node1, node2)?.allocate_flow(flow)?;
        Ok(())
    }

    /// Releases the flow from `node1 -> node2`. A hop the flow was evicted from is skipped.
    pub fn free_flow(&mut self, node1: NodeId, node2: NodeId, flow: FlowId) -> Result<()> {
        if self.evicted.remove(&(flow, node1, node2)) {
            return Ok(());
        }
        self.edge_mut(node1, node2)?.free_flow(flow)
    }

    /// Returns `true` if `node1` has a free transmit slot and `node2` a free receive slot.
    pub fn has_free_slots(&self, node1: NodeId, node2: NodeId) -> bool {
        match (self.nodes.get(&node1), self.nodes.get(&node2)) {
            (Some(n1), Some(n2)) => n1.tx_slots().has_free() && n2.rx_slots().has_free(),
            _ => false,
        }
    }

    fn check_endpoints(&self, node1: NodeId, node2: NodeId) -> Result<()> {
        self.node(node1)?;
        self.node(node2)?;
        if node1 == node2 {
            return Err(FlowsimError::WrongParameter(format!("self-loop on node {}", node1)));
        }
        Ok(())
    }

    fn take_slots(&mut self, node1: NodeId, node2: NodeId) -> Result<()> {
        if !self.node(node1)?.tx_slots().has_free() {
            return Err(FlowsimError::NoFreeSlot(node1));
        }
        if !self.node(node2)?.rx_slots().has_free() {
            return Err(FlowsimError::NoFreeSlot(node2));
        }
        self.node_mut(node1)?.take_tx_slot()?;
        self.node_mut(node2)?.take_rx_slot()
    }

    fn release_slots(&mut self, node1: NodeId, node2: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node1) {
            node.release_tx_slot();
        }
        if let Some(node) = self.nodes.get_mut(&node2) {
            node.release_rx_slot();
        }
    }
}
