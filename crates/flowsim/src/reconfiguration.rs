//! Load-rebalancing heuristic.
//!
//! The load of an active link `u -> v` is the arrival rate of `u` divided by the spare capacity of
//! the link plus one. Links whose load deviates from the mean by more than the threshold are
//! overloaded or underloaded. For every overloaded link the heuristic tries, in order:
//!
//! 1. to activate a parallel link between the same nodes;
//! 2. to activate the missing links of the shortest alternate path in the ghost topology;
//! 3. when a node of that path has no free port, to disconnect an idle underloaded link of
//!    that node and retry.
//!
//! A path is activated as a whole or not at all. It is best-effort: when no move is possible
//! the topology is left as is.

use std::collections::BTreeSet;

use log::debug;

use crate::edge::Edge;
use crate::error::Result;
use crate::ghost::GhostTopology;
use crate::node::NodeId;
use crate::routing::Path;
use crate::topology::Topology;

/// Changes applied by one run of the heuristic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconfigurationReport {
    pub overloaded: usize,
    pub underloaded: usize,
    pub parallel_added: usize,
    pub activated: usize,
    pub disconnected: usize,
}

impl ReconfigurationReport {
    pub fn moves(&self) -> usize {
        self.parallel_added + self.activated + self.disconnected
    }
}

/// Load of every active link, ordered by node ids.
pub fn link_loads(topology: &Topology) -> Result<Vec<((NodeId, NodeId), f64)>> {
    let mut loads = Vec::new();
    for (from, to, meta) in topology.edges() {
        if !meta.has_enabled() {
            continue;
        }
        let rate = topology.node(from)?.arrival_rate();
        loads.push(((from, to), rate / (meta.available_capacity() as f64 + 1.)));
    }
    Ok(loads)
}

pub fn rebalance(topology: &mut Topology, ghost: &GhostTopology, threshold: f64) -> Result<ReconfigurationReport> {
    let mut report = ReconfigurationReport::default();
    let loads = link_loads(topology)?;
    if loads.is_empty() {
        return Ok(report);
    }
    let mean = loads.iter().map(|(_, load)| load).sum::<f64>() / loads.len() as f64;

    let mut overloaded: Vec<_> = loads.iter().filter(|(_, load)| *load > mean + threshold).collect();
    overloaded.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut underloaded: BTreeSet<(NodeId, NodeId)> = loads
        .iter()
        .filter(|(_, load)| *load < mean - threshold)
        .map(|(link, _)| *link)
        .collect();
    report.overloaded = overloaded.len();
    report.underloaded = underloaded.len();
    debug!(
        target: "reconfiguration",
        "mean load {:.3}: {} overloaded, {} underloaded links",
        mean,
        report.overloaded,
        report.underloaded
    );

    for ((u, v), _) in overloaded {
        let (u, v) = (*u, *v);
        if topology.has_free_slots(u, v) {
            add_parallel(topology, ghost, u, v)?;
            report.parallel_added += 1;
            continue;
        }
        let path = match ghost.alternate_path(u, v) {
            Some(path) => path,
            None => continue,
        };
        match activate_path(topology, ghost, &underloaded, &path)? {
            Some(activation) => {
                *topology = activation.topology;
                underloaded = activation.underloaded;
                report.activated += activation.activated;
                report.disconnected += activation.disconnected;
            }
            None => {
                debug!(
                    target: "reconfiguration",
                    "alternate path {:?} for {} -> {} cannot be activated",
                    path.nodes,
                    u,
                    v
                );
            }
        }
    }
    Ok(report)
}

// Adds a new member to an active link, cloned from the ghost link or from an existing member.
fn add_parallel(topology: &mut Topology, ghost: &GhostTopology, u: NodeId, v: NodeId) -> Result<()> {
    if topology.edge(u, v)?.has_disabled() {
        topology.set_edge_enabled(u, v, true)?;
        debug!(target: "reconfiguration", "re-enabled parallel edge {} -> {}", u, v);
        return Ok(());
    }
    let edge = match ghost.link(u, v) {
        Some(link) => link.to_edge(),
        None => {
            let member = &topology.edge(u, v)?.members()[0];
            Edge::new(member.capacity(), member.base_weight())
        }
    };
    debug!(target: "reconfiguration", "added parallel edge {} -> {}", u, v);
    topology.add_edge(u, v, edge)
}

struct PathActivation {
    topology: Topology,
    underloaded: BTreeSet<(NodeId, NodeId)>,
    activated: usize,
    disconnected: usize,
}

// Activates every inactive hop of `path` on a copy of the topology. Returns `None`, leaving
// the topology untouched, if some hop cannot get its port slots.
fn activate_path(
    topology: &Topology,
    ghost: &GhostTopology,
    underloaded: &BTreeSet<(NodeId, NodeId)>,
    path: &Path,
) -> Result<Option<PathActivation>> {
    let mut activation = PathActivation {
        topology: topology.clone(),
        underloaded: underloaded.clone(),
        activated: 0,
        disconnected: 0,
    };
    for (a, b) in path.edges() {
        let trial = &mut activation.topology;
        if trial.is_active(a, b) {
            continue;
        }
        if !trial.has_free_slots(a, b) {
            activation.disconnected += free_slot(trial, &mut activation.underloaded, &path.nodes, a, b)?;
            if !trial.has_free_slots(a, b) {
                return Ok(None);
            }
        }
        activate(trial, ghost, a, b)?;
        if !trial.is_active(a, b) {
            return Ok(None);
        }
        activation.activated += 1;
    }
    Ok(Some(activation))
}

fn activate(topology: &mut Topology, ghost: &GhostTopology, a: NodeId, b: NodeId) -> Result<()> {
    if topology.has_edge(a, b) && topology.set_edge_enabled(a, b, true)? {
        debug!(target: "reconfiguration", "enabled edge {} -> {}", a, b);
        return Ok(());
    }
    if let Some(link) = ghost.link(a, b) {
        topology.add_edge(a, b, link.to_edge())?;
        debug!(target: "reconfiguration", "activated ghost edge {} -> {}", a, b);
    }
    Ok(())
}

// Disconnects idle underloaded links holding the transmit slot of `a` or the receive slot of `b`.
// Links between consecutive nodes of `path` are kept.
fn free_slot(
    topology: &mut Topology,
    underloaded: &mut BTreeSet<(NodeId, NodeId)>,
    path: &[NodeId],
    a: NodeId,
    b: NodeId,
) -> Result<usize> {
    let on_path: BTreeSet<(NodeId, NodeId)> = path.windows(2).map(|w| (w[0], w[1])).collect();
    let mut freed = 0;
    let needs_tx = !topology.node(a)?.tx_slots().has_free();
    let needs_rx = !topology.node(b)?.rx_slots().has_free();
    for (need, matches_node) in [(needs_tx, true), (needs_rx, false)] {
        if !need {
            continue;
        }
        let candidate = underloaded.iter().copied().find(|(x, y)| {
            let incident = if matches_node { *x == a } else { *y == b };
            incident
                && !on_path.contains(&(*x, *y))
                && topology.edge(*x, *y).map_or(false, |e| e.has_enabled() && e.flow_count() == 0)
        });
        if let Some((x, y)) = candidate {
            if topology.set_edge_enabled(x, y, false)? {
                debug!(target: "reconfiguration", "disconnected underloaded edge {} -> {}", x, y);
                underloaded.remove(&(x, y));
                freed += 1;
            }
        }
    }
    Ok(freed)
}
