//! Flows and the flow admission controller.

use std::collections::BTreeMap;

use log::error;

use crate::error::{FlowsimError, Result};
use crate::node::NodeId;
use crate::topology::Topology;

pub type FlowId = u64;

/// Key that is never handed out by [`KeyGenerator`].
pub const NO_FLOW: FlowId = 0;

/// Capacity reservation along a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flow {
    id: FlowId,
    path: Vec<NodeId>,
}

impl Flow {
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Nodes of the path, from the origin to the destination.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn source(&self) -> NodeId {
        self.path[0]
    }

    pub fn destination(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    /// Number of edges on the path.
    pub fn hops(&self) -> usize {
        self.path.len() - 1
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.path.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Generates unique flow keys. The first key is `seed + 1`.
#[derive(Clone, Debug)]
pub struct KeyGenerator {
    counter: FlowId,
}

impl KeyGenerator {
    pub fn new(seed: FlowId) -> Self {
        Self { counter: seed }
    }

    pub fn next_key(&mut self) -> FlowId {
        self.counter += 1;
        self.counter
    }

    pub fn is_valid_key(key: FlowId) -> bool {
        key != NO_FLOW
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Admits flows onto the topology and keeps track of the live ones.
#[derive(Clone, Debug, Default)]
pub struct FlowController {
    flows: BTreeMap<FlowId, Flow>,
    keys: KeyGenerator,
}

impl FlowController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a flow from `src` to `dst` and reserves capacity on each hop of the path.
    ///
    /// Fails with [`FlowsimError::NoPath`] if there is no path with spare capacity. If a hop
    /// cannot be reserved, every hop reserved before it is released and the error is returned.
    pub fn allocate_flow(&mut self, topology: &mut Topology, src: NodeId, dst: NodeId) -> Result<Flow> {
        if src == dst {
            return Err(FlowsimError::WrongParameter(format!(
                "flow source and destination are the same node {}",
                src
            )));
        }
        let path = topology.shortest_path(src, dst)?;
        let id = self.keys.next_key();
        let flow = Flow { id, path: path.nodes };

        let mut reserved = Vec::with_capacity(flow.hops());
        for (from, to) in flow.edges() {
            if let Err(e) = topology.allocate_flow(from, to, id) {
                for (r_from, r_to) in reserved {
                    if let Err(rollback) = topology.free_flow(r_from, r_to, id) {
                        error!(
                            target: "flow",
                            "failed to release flow {} from {} -> {}: {}",
                            id,
                            r_from,
                            r_to,
                            rollback
                        );
                    }
                }
                return Err(e);
            }
            reserved.push((from, to));
        }

        self.flows.insert(id, flow.clone());
        Ok(flow)
    }

    /// Releases the capacity held by a live flow.
    pub fn free_flow(&mut self, topology: &mut Topology, id: FlowId) -> Result<Flow> {
        let flow = self.flows.remove(&id).ok_or(FlowsimError::NotRegisteredFlow(id))?;
        for (from, to) in flow.edges() {
            topology.free_flow(from, to, id)?;
        }
        Ok(flow)
    }

    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.get(&id)
    }

    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }
}
