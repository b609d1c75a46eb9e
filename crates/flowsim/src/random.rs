//! Seeded random streams of the simulation.

use rand::prelude::*;
use rand_distr::Exp;
use rand_pcg::Pcg64;

use crate::error::{FlowsimError, Result};
use crate::node::NodeId;
use crate::topology::Topology;

const MAX_PICK_ATTEMPTS: usize = 10;

/// Source of inter-arrival times, service durations and flow endpoints.
#[derive(Clone)]
pub struct RandomGenerator {
    rand: Pcg64,
}

impl RandomGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }

    /// Draws from the exponential distribution with the given rate, zero rate gives infinity.
    pub fn exp(&mut self, rate: f64) -> f64 {
        match Exp::new(rate) {
            Ok(dist) if rate > 0. => dist.sample(&mut self.rand),
            _ => f64::INFINITY,
        }
    }

    pub fn next_arrival(&mut self, arrival_rate: f64) -> f64 {
        self.exp(arrival_rate)
    }

    pub fn service_duration(&mut self, service_rate: f64) -> f64 {
        self.exp(service_rate)
    }

    fn choose(&mut self, nodes: &[NodeId]) -> Option<NodeId> {
        nodes.choose(&mut self.rand).copied()
    }

    /// Picks an exit node other than `src`.
    pub fn random_exit(&mut self, topology: &Topology, src: NodeId) -> Result<NodeId> {
        let candidates: Vec<NodeId> = topology.exit_nodes().into_iter().filter(|n| *n != src).collect();
        self.choose(&candidates)
            .ok_or_else(|| FlowsimError::Loop(format!("no exit node other than {}", src)))
    }

    /// Picks a random entry node and a random exit node distinct from it.
    pub fn random_io_nodes(&mut self, topology: &Topology) -> Result<(NodeId, NodeId)> {
        let entries = topology.entry_nodes();
        let exits = topology.exit_nodes();
        for _ in 0..MAX_PICK_ATTEMPTS {
            let (src, dst) = match (self.choose(&entries), self.choose(&exits)) {
                (Some(src), Some(dst)) => (src, dst),
                _ => break,
            };
            if src != dst {
                return Ok((src, dst));
            }
        }
        Err(FlowsimError::Loop(format!(
            "no distinct entry and exit nodes after {} attempts",
            MAX_PICK_ATTEMPTS
        )))
    }
}
