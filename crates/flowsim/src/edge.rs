//! Capacitated edges and groups of parallel edges.

use std::collections::BTreeSet;

use crate::error::{FlowsimError, Result};
use crate::flow::FlowId;

/// Directed link carrying at most `capacity` flows at once.
///
/// The routing weight of an edge is infinite while it is disabled or has no capacity left.
#[derive(Clone, Debug)]
pub struct Edge {
    capacity: usize,
    available: usize,
    flows: BTreeSet<FlowId>,
    weight: f64,
    enabled: bool,
}

impl Edge {
    pub fn new(capacity: usize, weight: f64) -> Self {
        Self {
            capacity,
            available: capacity,
            flows: BTreeSet::new(),
            weight,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_capacity(&self) -> usize {
        self.available
    }

    pub fn flows(&self) -> &BTreeSet<FlowId> {
        &self.flows
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn is_occupied(&self) -> bool {
        !self.flows.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_saturated(&self) -> bool {
        self.available == 0
    }

    /// Configured weight, regardless of the edge state.
    pub fn base_weight(&self) -> f64 {
        self.weight
    }

    /// Weight used for routing.
    pub fn weight(&self) -> f64 {
        if !self.enabled || self.is_saturated() {
            f64::INFINITY
        } else {
            self.weight
        }
    }

    pub fn allocate_flow(&mut self, flow: FlowId) -> Result<()> {
        if !self.enabled {
            return Err(FlowsimError::ResourceAllocation(format!(
                "flow {} allocated on a disabled edge",
                flow
            )));
        }
        if self.is_saturated() {
            return Err(FlowsimError::ResourceAllocation(format!(
                "flow {} allocated on a saturated edge",
                flow
            )));
        }
        if !self.flows.insert(flow) {
            return Err(FlowsimError::ResourceAllocation(format!(
                "flow {} is already allocated on the edge",
                flow
            )));
        }
        self.available -= 1;
        Ok(())
    }

    pub fn free_flow(&mut self, flow: FlowId) -> Result<()> {
        if !self.flows.remove(&flow) {
            return Err(FlowsimError::ResourceAllocation(format!(
                "flow {} does not occupy the edge",
                flow
            )));
        }
        self.available += 1;
        Ok(())
    }

    /// Enables or disables the edge. Disabling an edge with active flows fails.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if !enabled && self.is_occupied() {
            return Err(FlowsimError::ResourceAllocation(format!(
                "cannot disable an edge carrying {} flows",
                self.flows.len()
            )));
        }
        self.enabled = enabled;
        Ok(())
    }

    /// Drops all flows from the edge and returns them.
    pub(crate) fn evict_flows(&mut self) -> Vec<FlowId> {
        let flows = std::mem::take(&mut self.flows);
        self.available = self.capacity;
        flows.into_iter().collect()
    }
}

/// Parallel edges between the same ordered pair of nodes.
///
/// A flow is put on the member with the lowest current weight (the first one on ties), so the weight
/// of the group is the minimum weight of its members.
#[derive(Clone, Debug, Default)]
pub struct MetaEdge {
    edges: Vec<Edge>,
}

impl MetaEdge {
    pub fn new(edge: Edge) -> Self {
        Self { edges: vec![edge] }
    }

    pub fn push(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn members(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight()).fold(f64::INFINITY, f64::min)
    }

    /// Sum of capacities of the enabled members.
    pub fn capacity(&self) -> usize {
        self.edges.iter().filter(|e| e.is_enabled()).map(|e| e.capacity()).sum()
    }

    /// Sum of available capacities of the enabled members.
    pub fn available_capacity(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.is_enabled())
            .map(|e| e.available_capacity())
            .sum()
    }

    pub fn enabled_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_enabled()).count()
    }

    pub fn has_enabled(&self) -> bool {
        self.edges.iter().any(|e| e.is_enabled())
    }

    pub fn has_disabled(&self) -> bool {
        self.edges.iter().any(|e| !e.is_enabled())
    }

    pub fn flow_count(&self) -> usize {
        self.edges.iter().map(|e| e.flow_count()).sum()
    }

    pub fn contains_flow(&self, flow: FlowId) -> bool {
        self.edges.iter().any(|e| e.flows().contains(&flow))
    }

    fn best_member(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, edge) in self.edges.iter().enumerate() {
            let weight = edge.weight();
            if weight.is_infinite() {
                continue;
            }
            if best.map_or(true, |(_, w)| weight < w) {
                best = Some((i, weight));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Puts the flow on the member with the lowest weight and returns the member index.
    pub fn allocate_flow(&mut self, flow: FlowId) -> Result<usize> {
        let idx = self.best_member().ok_or_else(|| {
            FlowsimError::ResourceAllocation(format!("no member edge can carry flow {}", flow))
        })?;
        self.edges[idx].allocate_flow(flow)?;
        Ok(idx)
    }

    pub fn free_flow(&mut self, flow: FlowId) -> Result<()> {
        match self.edges.iter_mut().find(|e| e.flows().contains(&flow)) {
            Some(edge) => edge.free_flow(flow),
            None => Err(FlowsimError::ResourceAllocation(format!(
                "flow {} does not occupy any member edge",
                flow
            ))),
        }
    }

    /// Removes the member carrying the fewest flows, disabled members first.
    ///
    /// An occupied member is removed only if `force` is set, its flows are returned.
    pub fn remove_least_busy(&mut self, force: bool) -> Result<(Edge, Vec<FlowId>)> {
        let idx = self
            .edges
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.is_enabled(), e.flow_count()))
            .map(|(i, _)| i)
            .ok_or_else(|| FlowsimError::ResourceAllocation("meta-edge has no members".to_string()))?;
        if self.edges[idx].is_occupied() && !force {
            return Err(FlowsimError::ResourceAllocation(format!(
                "least busy edge still carries {} flows",
                self.edges[idx].flow_count()
            )));
        }
        let mut edge = self.edges.remove(idx);
        let evicted = edge.evict_flows();
        Ok((edge, evicted))
    }

    /// Enables the first disabled member. Returns `false` if all members are enabled.
    pub(crate) fn enable_one(&mut self) -> bool {
        match self.edges.iter_mut().find(|e| !e.is_enabled()) {
            Some(edge) => {
                edge.enabled = true;
                true
            }
            None => false,
        }
    }

    /// Disables the enabled member carrying the fewest flows. Returns `false` if no member is enabled.
    pub(crate) fn disable_one(&mut self) -> Result<bool> {
        match self
            .edges
            .iter_mut()
            .filter(|e| e.is_enabled())
            .min_by_key(|e| e.flow_count())
        {
            Some(edge) => edge.set_enabled(false).map(|_| true),
            None => Ok(false),
        }
    }
}

impl From<Edge> for MetaEdge {
    fn from(edge: Edge) -> Self {
        Self::new(edge)
    }
}
