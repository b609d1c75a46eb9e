//! Simulation driver.

use log::info;

use crate::config::{ConvergenceConfig, EdgeRecord, NodeRecord, SimulationConfig, UserEventRecord};
use crate::edge::Edge;
use crate::error::{FlowsimError, Result};
use crate::event::UserEvent;
use crate::ghost::GhostTopology;
use crate::node::{Node, NodeRole};
use crate::random::RandomGenerator;
use crate::result::{ResultStore, Snapshot};
use crate::scheduler::EventScheduler;
use crate::topology::Topology;

const DEFAULT_CAPACITY: usize = 1;
const DEFAULT_WEIGHT: f64 = 1.;

/// Flow admission simulation over a capacitated topology.
///
/// A simulation is created with default rates, initialized with node and edge records and then
/// launched. The records are kept, so the run can be rebuilt with [`Simulation::reset`]. Cloning
/// a simulation gives a fully independent copy which replays the same random streams.
///
/// ```rust
/// use flowsim::config::{EdgeRecord, NodeRecord};
/// use flowsim::simulation::Simulation;
///
/// let mut sim = Simulation::new(0.9, 0.9, Some(42));
/// sim.set_max_arrivals(Some(1000));
/// sim.init_simulation(&[NodeRecord::new(0), NodeRecord::new(1)], &[EdgeRecord::new(0, 1)])
///     .unwrap();
/// let results = sim.launch_simulation().unwrap();
/// assert!(results.get("Blocking_rate").unwrap() > 0.);
/// ```
#[derive(Clone)]
pub struct Simulation {
    arrival_rate: f64,
    service_rate: f64,
    seed: u64,
    max_arrivals: Option<u64>,
    convergence: ConvergenceConfig,
    user_events: Vec<UserEvent>,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    scheduler: Option<EventScheduler>,
}

impl Simulation {
    /// Creates a simulation with default node rates. A random seed is drawn if none is given.
    pub fn new(arrival_rate: f64, service_rate: f64, seed: Option<u64>) -> Self {
        Self {
            arrival_rate,
            service_rate,
            seed: seed.unwrap_or_else(rand::random),
            max_arrivals: None,
            convergence: ConvergenceConfig::default(),
            user_events: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            scheduler: None,
        }
    }

    /// Creates a simulation with administrative events. Every record is validated here.
    pub fn with_events(
        arrival_rate: f64,
        service_rate: f64,
        seed: Option<u64>,
        events: &[UserEventRecord],
    ) -> Result<Self> {
        let mut sim = Self::new(arrival_rate, service_rate, seed);
        sim.user_events = events.iter().map(UserEvent::try_from).collect::<Result<_>>()?;
        Ok(sim)
    }

    /// Creates and initializes a simulation from a config.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let mut sim = Self::with_events(config.arrival_rate, config.service_rate, config.seed, &config.events)?;
        sim.convergence = config.convergence.clone();
        sim.max_arrivals = config.max_arrivals;
        let (nodes, edges) = config.topology_records()?;
        sim.init_simulation(&nodes, &edges)?;
        Ok(sim)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Changes the seed. Takes effect on the next [`Self::init_simulation`] or [`Self::reset`].
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    /// Limits the number of arrivals of a run. Takes effect on the next initialization.
    pub fn set_max_arrivals(&mut self, max_arrivals: Option<u64>) {
        self.max_arrivals = max_arrivals;
    }

    /// Sets the convergence criterion. Takes effect on the next initialization.
    pub fn set_convergence(&mut self, convergence: ConvergenceConfig) {
        self.convergence = convergence;
    }

    /// Builds the topology from records and prepares the run.
    ///
    /// Fails without adding any node if two node records share an id.
    pub fn init_simulation(&mut self, nodes: &[NodeRecord], edges: &[EdgeRecord]) -> Result<()> {
        self.nodes = nodes.to_vec();
        self.edges = edges.to_vec();
        self.build()
    }

    /// Rebuilds the run from the stored records with new default rates.
    pub fn reset(&mut self, arrival_rate: Option<f64>, service_rate: Option<f64>) -> Result<()> {
        if self.scheduler.is_none() {
            return Err(FlowsimError::NotInitialized);
        }
        if let Some(rate) = arrival_rate {
            self.arrival_rate = rate;
        }
        if let Some(rate) = service_rate {
            self.service_rate = rate;
        }
        self.build()
    }

    fn build(&mut self) -> Result<()> {
        self.scheduler = None;
        let (topology, ghost) = self.build_topology()?;
        info!(
            target: "simulation",
            "topology: {} nodes, {} links, {} potential links",
            topology.node_count(),
            topology.edges().count(),
            ghost.link_count()
        );
        let mut scheduler = EventScheduler::new(
            topology,
            ghost,
            RandomGenerator::new(self.seed),
            self.convergence.clone(),
            self.max_arrivals,
        )?;
        scheduler.seed_arrivals()?;
        for event in &self.user_events {
            scheduler.add_user_event(event)?;
        }
        self.scheduler = Some(scheduler);
        Ok(())
    }

    fn build_topology(&self) -> Result<(Topology, GhostTopology)> {
        let mut topology = Topology::new();
        let mut ghost = GhostTopology::new();
        let nodes = self
            .nodes
            .iter()
            .map(|record| {
                let node = Node::new(
                    record.id,
                    record.arrival_rate.unwrap_or(self.arrival_rate),
                    record.service_rate.unwrap_or(self.service_rate),
                )?
                .with_role(record.role.unwrap_or(NodeRole::Both))
                .with_slots(record.tx_slots, record.rx_slots);
                Ok(match &record.name {
                    Some(name) => node.with_name(name),
                    None => node,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        topology.add_nodes(nodes)?;

        for record in &self.edges {
            let capacity = record.capacity.unwrap_or(DEFAULT_CAPACITY);
            let weight = record.weight.unwrap_or(DEFAULT_WEIGHT);
            let enabled = record.enabled.unwrap_or(true);
            for (from, to) in record.directions() {
                let edge = Edge::new(capacity, weight);
                topology.add_edge(from, to, if enabled { edge } else { edge.disabled() })?;
                ghost.add_link(from, to, capacity, weight);
            }
        }
        Ok((topology, ghost))
    }

    fn scheduler(&self) -> Result<&EventScheduler> {
        self.scheduler.as_ref().ok_or(FlowsimError::NotInitialized)
    }

    /// Runs until termination and returns the final general results.
    pub fn launch_simulation(&mut self) -> Result<Snapshot> {
        let scheduler = self.scheduler.as_mut().ok_or(FlowsimError::NotInitialized)?;
        scheduler.run()?;
        Ok(Snapshot {
            time: scheduler.time(),
            values: scheduler.results().general_results(),
        })
    }

    /// Handles a single event, returns `false` once the run is over.
    pub fn step(&mut self) -> Result<bool> {
        self.scheduler
            .as_mut()
            .ok_or(FlowsimError::NotInitialized)?
            .step()
    }

    pub fn time(&self) -> f64 {
        self.scheduler.as_ref().map_or(0., |s| s.time())
    }

    pub fn results(&self) -> Result<&ResultStore> {
        Ok(self.scheduler()?.results())
    }

    pub fn topology(&self) -> Result<&Topology> {
        Ok(self.scheduler()?.topology())
    }

    pub fn event_scheduler(&self) -> Result<&EventScheduler> {
        self.scheduler()
    }
}
