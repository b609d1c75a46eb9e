//! Event scheduler: the main loop of a simulation run.

use std::collections::BTreeSet;

use log::Level::Trace;
use log::log_enabled;
use serde_json::json;

use flowsim_core::{log_debug, log_info, log_trace, Event, SimulationState};

use crate::config::ConvergenceConfig;
use crate::error::{FlowsimError, Result};
use crate::event::{ArrivalBurst, EventKind, FlowEvent, Issuer, Reconfigure, Sample, UserEvent};
use crate::flow::{FlowController, FlowId};
use crate::ghost::GhostTopology;
use crate::node::NodeId;
use crate::random::RandomGenerator;
use crate::reconfiguration;
use crate::result::{ResultKey, ResultStore, UpdateFunction};
use crate::topology::Topology;

pub const BLOCKING_RATE: &str = "Blocking_rate";
pub const MEAN_HOPS: &str = "mean_hops";

/// Owns the state of one run and handles events in order of their handling time.
///
/// The run stops when an end-of-simulation event is handled, when only sample events are left
/// in the queue, or when the tracked metric has converged and no user event is pending.
#[derive(Clone)]
pub struct EventScheduler {
    state: SimulationState<FlowEvent>,
    topology: Topology,
    ghost: GhostTopology,
    controller: FlowController,
    random: RandomGenerator,
    results: ResultStore,
    convergence: ConvergenceConfig,
    max_arrivals: Option<u64>,
    scheduled_arrivals: u64,
    arrival_chains: BTreeSet<NodeId>,
    remaining_user_events: usize,
    live_events: usize,
    outcomes: u64,
    converged: bool,
    eos: bool,
}

impl EventScheduler {
    pub fn new(
        topology: Topology,
        ghost: GhostTopology,
        random: RandomGenerator,
        convergence: ConvergenceConfig,
        max_arrivals: Option<u64>,
    ) -> Result<Self> {
        if convergence.check_every == 0 {
            return Err(FlowsimError::WrongParameter(
                "convergence check interval must be positive".to_string(),
            ));
        }
        let mut results = ResultStore::new();
        results.add_computed_value(
            BLOCKING_RATE,
            UpdateFunction::Ratio {
                numerator: EventKind::AllocationFailure.name().to_string(),
                denominator: EventKind::Arrival.name().to_string(),
            },
            true,
        );
        results.add_computed_value(
            MEAN_HOPS,
            UpdateFunction::Mean {
                count: "Flow_allocation_success".to_string(),
            },
            true,
        );
        results.register_convergence(&convergence.metric, convergence.samples, convergence.epsilon)?;
        Ok(Self {
            state: SimulationState::new(),
            topology,
            ghost,
            controller: FlowController::new(),
            random,
            results,
            convergence,
            max_arrivals,
            scheduled_arrivals: 0,
            arrival_chains: BTreeSet::new(),
            remaining_user_events: 0,
            live_events: 0,
            outcomes: 0,
            converged: false,
            eos: false,
        })
    }

    pub fn time(&self) -> f64 {
        self.state.time()
    }

    pub fn name(&self) -> &str {
        "scheduler"
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn ghost(&self) -> &GhostTopology {
        &self.ghost
    }

    pub fn controller(&self) -> &FlowController {
        &self.controller
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn has_converged(&self) -> bool {
        self.converged
    }

    pub fn is_finished(&self) -> bool {
        self.eos
    }

    pub fn remaining_user_events(&self) -> usize {
        self.remaining_user_events
    }

    /// Number of pending events other than samples.
    pub fn live_events(&self) -> usize {
        self.live_events
    }

    pub fn scheduled_arrivals(&self) -> u64 {
        self.scheduled_arrivals
    }

    fn add_event(&mut self, issuer: Issuer, kind: EventKind, delay: f64) {
        let event = FlowEvent::new(issuer, kind);
        if !event.is_sample() {
            self.live_events += 1;
        }
        if event.is_counted_user_event() {
            self.remaining_user_events += 1;
        }
        self.state.add_event(event, delay);
    }

    fn arrivals_permitted(&self) -> bool {
        self.max_arrivals.map_or(true, |max| self.scheduled_arrivals < max)
    }

    /// Schedules the next arrival of the node if its rate and the arrival budget allow it.
    /// Returns `false` if the chain of arrivals of the node ends.
    fn schedule_arrival(&mut self, node: NodeId) -> Result<bool> {
        let rate = self.topology.node(node)?.arrival_rate();
        if rate <= 0. || !self.arrivals_permitted() {
            self.arrival_chains.remove(&node);
            return Ok(false);
        }
        let delay = self.random.next_arrival(rate);
        self.scheduled_arrivals += 1;
        self.arrival_chains.insert(node);
        self.add_event(Issuer::Node(node), EventKind::Arrival, delay);
        Ok(true)
    }

    /// Starts one arrival chain per entry node.
    pub fn seed_arrivals(&mut self) -> Result<()> {
        for node in self.topology.entry_nodes() {
            self.schedule_arrival(node)?;
        }
        Ok(())
    }

    /// Schedules a validated user event at its absolute trigger time.
    pub fn add_user_event(&mut self, event: &UserEvent) -> Result<()> {
        if let Some(node) = event.target_node() {
            self.topology.node(node)?;
        }
        let delay = event.time - self.time();
        if delay < 0. {
            return Err(FlowsimError::WrongParameter(format!(
                "user event `{}` is scheduled in the past ({} < {})",
                event.kind.name(),
                event.time,
                self.time()
            )));
        }
        self.add_event(Issuer::User, event.kind.clone(), delay);
        Ok(())
    }

    fn should_stop(&self) -> bool {
        self.eos || self.live_events == 0 || (self.converged && self.remaining_user_events == 0)
    }

    /// Handles the next event. Returns `false` once the run is over.
    pub fn step(&mut self) -> Result<bool> {
        if self.should_stop() {
            return Ok(false);
        }
        match self.state.next_event() {
            Some(event) => {
                if !event.data.is_sample() {
                    self.live_events -= 1;
                }
                self.handle_event(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handles events until the run is over.
    pub fn run(&mut self) -> Result<()> {
        log_info!(
            self,
            "starting event processing: {} pending events, {} user events",
            self.state.pending(),
            self.remaining_user_events
        );
        while self.step()? {}
        log_info!(
            self,
            "stopped after {} events (converged: {}, end of simulation: {}, live events: {})",
            self.state.event_count() - self.state.pending() as u64,
            self.converged,
            self.eos,
            self.live_events
        );
        Ok(())
    }

    fn handle_event(&mut self, event: Event<FlowEvent>) -> Result<()> {
        if log_enabled!(Trace) {
            log_trace!(self, "{}", json!({"id": event.id, "data": event.data}));
        }
        let data = event.data;
        self.handle(&data)?;
        self.update_result(&data)?;
        self.post_handle(&data)
    }

    fn handle(&mut self, event: &FlowEvent) -> Result<()> {
        match &event.kind {
            EventKind::Arrival => match event.issuer {
                Issuer::Node(node) => self.on_arrival(node),
                issuer => Err(FlowsimError::WrongParameter(format!(
                    "arrival issued by {:?} instead of a node",
                    issuer
                ))),
            },
            EventKind::EndFlow { flow } => self.on_end_flow(*flow),
            EventKind::AllocationSuccess { .. } | EventKind::AllocationFailure => Ok(()),
            EventKind::EndOfSimulation => {
                self.eos = true;
                log_info!(self, "end of simulation");
                Ok(())
            }
            EventKind::ArrivalBurst(burst) => self.on_arrival_burst(burst),
            EventKind::Sample(sample) => {
                let time = self.time();
                self.results.record_sample(&sample.metric, time);
                Ok(())
            }
            EventKind::Reconfigure(reconfigure) => self.on_reconfigure(reconfigure),
            EventKind::Watcher => Ok(()),
        }
    }

    fn on_arrival(&mut self, node: NodeId) -> Result<()> {
        self.schedule_arrival(node)?;
        let dst = self.random.random_exit(&self.topology, node)?;
        match self.controller.allocate_flow(&mut self.topology, node, dst) {
            Ok(flow) => {
                self.add_event(
                    Issuer::Node(node),
                    EventKind::AllocationSuccess {
                        flow: flow.id(),
                        hops: flow.hops(),
                    },
                    0.,
                );
                let service_rate = self.topology.node(node)?.service_rate();
                let duration = self.random.service_duration(service_rate);
                self.add_event(Issuer::Controller, EventKind::EndFlow { flow: flow.id() }, duration);
                Ok(())
            }
            Err(FlowsimError::NoPath { .. }) => {
                self.add_event(Issuer::Node(node), EventKind::AllocationFailure, 0.);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn on_end_flow(&mut self, flow: FlowId) -> Result<()> {
        self.controller.free_flow(&mut self.topology, flow)?;
        Ok(())
    }

    fn on_arrival_burst(&mut self, burst: &ArrivalBurst) -> Result<()> {
        let node = self.topology.node_mut(burst.node)?;
        match burst.rate {
            Some(rate) => node.override_arrival_rate(rate)?,
            None => node.restore_arrival_rate(),
        }
        let is_entry = node.role().is_entry();
        let rate = node.arrival_rate();
        log_debug!(self, "arrival rate of node {} set to {}", burst.node, rate);
        if is_entry && !self.arrival_chains.contains(&burst.node) {
            self.schedule_arrival(burst.node)?;
        }
        Ok(())
    }

    fn on_reconfigure(&mut self, reconfigure: &Reconfigure) -> Result<()> {
        let report = reconfiguration::rebalance(&mut self.topology, &self.ghost, reconfigure.threshold)?;
        log_debug!(
            self,
            "reconfiguration: {} overloaded links, {} moves",
            report.overloaded,
            report.moves()
        );
        self.results
            .increase_value("Reconfiguration_moves", ResultKey::General, report.moves() as f64);
        Ok(())
    }

    fn update_result(&mut self, event: &FlowEvent) -> Result<()> {
        let name = event.kind.name();
        self.results.increase_value(name, ResultKey::General, 1.);
        if let Issuer::Node(node) = event.issuer {
            self.results.increase_value(name, ResultKey::Node(node), 1.);
        }
        if let EventKind::AllocationSuccess { hops, .. } = event.kind {
            self.results
                .update_computed_value(MEAN_HOPS, ResultKey::General, hops as f64)?;
            if let Issuer::Node(node) = event.issuer {
                self.results
                    .update_computed_value(MEAN_HOPS, ResultKey::Node(node), hops as f64)?;
            }
        }
        Ok(())
    }

    fn post_handle(&mut self, event: &FlowEvent) -> Result<()> {
        if event.is_counted_user_event() {
            self.remaining_user_events -= 1;
        }
        match &event.kind {
            EventKind::Sample(Sample { metric, interval }) => {
                self.add_event(
                    Issuer::User,
                    EventKind::Sample(Sample {
                        metric: metric.clone(),
                        interval: *interval,
                    }),
                    *interval,
                );
            }
            EventKind::EndOfSimulation => {
                let time = self.time();
                self.results.take_snapshot(EventKind::EndOfSimulation.name(), time, &[]);
            }
            kind if kind.is_outcome() => {
                self.outcomes += 1;
                if self.outcomes % self.convergence.check_every == 0 {
                    let converged = self.results.check_convergence(&self.convergence.metric)?;
                    if converged && !self.converged {
                        log_info!(
                            self,
                            "{} converged to {:.4} after {} outcomes",
                            self.convergence.metric,
                            self.results.get_general(&self.convergence.metric),
                            self.outcomes
                        );
                    }
                    self.converged = converged;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
