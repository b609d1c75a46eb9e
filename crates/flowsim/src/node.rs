//! Network nodes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{FlowsimError, Result};

pub type NodeId = usize;

/// Eligibility of a node as a flow endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Only forwards flows of other nodes.
    #[serde(alias = "ordinary")]
    Transit,
    /// Generates arrivals.
    Entry,
    /// Can be picked as the destination of a flow.
    Exit,
    #[default]
    Both,
}

impl NodeRole {
    pub fn is_entry(&self) -> bool {
        matches!(self, NodeRole::Entry | NodeRole::Both)
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, NodeRole::Exit | NodeRole::Both)
    }
}

/// Counter of transmit or receive ports, each attached edge holds one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortSlots {
    limit: Option<usize>,
    used: usize,
}

impl PortSlots {
    pub fn unlimited() -> Self {
        Self { limit: None, used: 0 }
    }

    pub fn limited(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            used: 0,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Number of free slots, `None` if the counter is unlimited.
    pub fn available(&self) -> Option<usize> {
        self.limit.map(|limit| limit - self.used)
    }

    pub fn has_free(&self) -> bool {
        self.limit.map_or(true, |limit| self.used < limit)
    }

    fn take(&mut self) -> bool {
        if self.has_free() {
            self.used += 1;
            true
        } else {
            false
        }
    }

    fn release(&mut self) {
        self.used = self.used.saturating_sub(1);
    }
}

impl Default for PortSlots {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Network node.
///
/// The identifier never changes. The arrival rate can be overridden by an arrival burst, in which
/// case the value it replaced is kept so it can be restored later.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    arrival_rate: f64,
    service_rate: f64,
    arrival_rate_backup: Option<f64>,
    role: NodeRole,
    tx_slots: PortSlots,
    rx_slots: PortSlots,
}

impl Node {
    pub fn new(id: NodeId, arrival_rate: f64, service_rate: f64) -> Result<Self> {
        check_rate("arrival", arrival_rate)?;
        check_rate("service", service_rate)?;
        Ok(Self {
            id,
            name: format!("node-{}", id),
            arrival_rate,
            service_rate,
            arrival_rate_backup: None,
            role: NodeRole::default(),
            tx_slots: PortSlots::unlimited(),
            rx_slots: PortSlots::unlimited(),
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    /// Limits the number of transmit (`tx`) and receive (`rx`) ports, `None` means unlimited.
    pub fn with_slots(mut self, tx: Option<usize>, rx: Option<usize>) -> Self {
        self.tx_slots = tx.map_or_else(PortSlots::unlimited, PortSlots::limited);
        self.rx_slots = rx.map_or_else(PortSlots::unlimited, PortSlots::limited);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    pub fn set_service_rate(&mut self, rate: f64) -> Result<()> {
        check_rate("service", rate)?;
        self.service_rate = rate;
        Ok(())
    }

    /// Replaces the arrival rate. The original rate is remembered until [`Self::restore_arrival_rate`] is called,
    /// successive overrides keep the first remembered value.
    pub fn override_arrival_rate(&mut self, rate: f64) -> Result<()> {
        check_rate("arrival", rate)?;
        if self.arrival_rate_backup.is_none() {
            self.arrival_rate_backup = Some(self.arrival_rate);
        }
        self.arrival_rate = rate;
        Ok(())
    }

    /// Restores the arrival rate saved by the first override. Does nothing if the rate was not overridden.
    pub fn restore_arrival_rate(&mut self) {
        if let Some(rate) = self.arrival_rate_backup.take() {
            self.arrival_rate = rate;
        }
    }

    pub fn is_rate_overridden(&self) -> bool {
        self.arrival_rate_backup.is_some()
    }

    pub fn tx_slots(&self) -> &PortSlots {
        &self.tx_slots
    }

    pub fn rx_slots(&self) -> &PortSlots {
        &self.rx_slots
    }

    pub(crate) fn take_tx_slot(&mut self) -> Result<()> {
        if self.tx_slots.take() {
            Ok(())
        } else {
            Err(FlowsimError::NoFreeSlot(self.id))
        }
    }

    pub(crate) fn take_rx_slot(&mut self) -> Result<()> {
        if self.rx_slots.take() {
            Ok(())
        } else {
            Err(FlowsimError::NoFreeSlot(self.id))
        }
    }

    pub(crate) fn release_tx_slot(&mut self) {
        self.tx_slots.release();
    }

    pub(crate) fn release_rx_slot(&mut self) {
        self.rx_slots.release();
    }
}

fn check_rate(kind: &str, rate: f64) -> Result<()> {
    if rate.is_finite() && rate >= 0. {
        Ok(())
    } else {
        Err(FlowsimError::WrongParameter(format!("{} rate must be non-negative, got {}", kind, rate)))
    }
}

/// Hands out node identifiers.
///
/// Declared identifiers are reserved explicitly, generated ones continue after the largest
/// identifier seen so far.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: NodeId,
    reserved: BTreeSet<NodeId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh identifier and marks it as used.
    pub fn next_id(&mut self) -> NodeId {
        while self.reserved.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.reserved.insert(id);
        self.next += 1;
        id
    }

    /// Marks a declared identifier as used.
    pub fn reserve(&mut self, id: NodeId) -> Result<()> {
        if !self.reserved.insert(id) {
            return Err(FlowsimError::DuplicatedNode(id));
        }
        if id >= self.next {
            self.next = id + 1;
        }
        Ok(())
    }

    pub fn is_reserved(&self, id: NodeId) -> bool {
        self.reserved.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.reserved.len()
    }
}
