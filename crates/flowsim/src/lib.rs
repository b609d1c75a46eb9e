//! A discrete-event simulator of flow admission and routing over a capacitated network.
//!
//! Flows arrive at entry nodes as Poisson processes, are routed along the shortest path with
//! spare capacity and hold one unit of capacity on every edge of the path for an exponentially
//! distributed time. Arrivals which find no path are blocked. A run stops once the tracked
//! metric (the blocking rate by default) is stable.
//!
//! ## Example
//!
//! ```rust
//! use flowsim::config::SimulationConfig;
//! use flowsim::simulation::Simulation;
//!
//! let config: SimulationConfig = r#"
//! arrival_rate: 0.9
//! service_rate: 0.9
//! seed: 1
//! max_arrivals: 2000
//! nodes: [{id: 0}, {id: 1}, {id: 2}]
//! edges: [{endpoints: [0, 1]}, {endpoints: [1, 2]}, {endpoints: [2, 0]}]
//! "#
//! .parse()
//! .unwrap();
//! let mut sim = Simulation::from_config(&config).unwrap();
//! let results = sim.launch_simulation().unwrap();
//! println!("blocking rate: {:?}", results.get("Blocking_rate"));
//! ```

pub mod config;
pub mod edge;
pub mod error;
pub mod event;
pub mod flow;
pub mod generators;
pub mod ghost;
pub mod node;
pub mod random;
pub mod reconfiguration;
pub mod result;
pub mod routing;
pub mod scheduler;
pub mod simulation;
pub mod sweep;
pub mod topology;

pub use config::{EdgeRecord, NodeRecord, SimulationConfig, UserEventRecord};
pub use error::{FlowsimError, Result};
pub use flow::{Flow, FlowController, FlowId};
pub use node::{Node, NodeId, NodeRole};
pub use result::{ResultKey, ResultStore, Snapshot};
pub use simulation::Simulation;
pub use topology::Topology;
