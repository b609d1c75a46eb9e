//! Configuration records and YAML loading.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FlowsimError, Result};
use crate::generators::{self, GeneratedTopology};
use crate::node::{IdAllocator, NodeId, NodeRole};

/// Description of a node. Missing fields take the simulation defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arrival_rate: Option<f64>,
    #[serde(default)]
    pub service_rate: Option<f64>,
    #[serde(default)]
    pub role: Option<NodeRole>,
    #[serde(default)]
    pub tx_slots: Option<usize>,
    #[serde(default)]
    pub rx_slots: Option<usize>,
}

impl NodeRecord {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_rates(mut self, arrival_rate: f64, service_rate: f64) -> Self {
        self.arrival_rate = Some(arrival_rate);
        self.service_rate = Some(service_rate);
        self
    }

    pub fn with_slots(mut self, tx_slots: usize, rx_slots: usize) -> Self {
        self.tx_slots = Some(tx_slots);
        self.rx_slots = Some(rx_slots);
        self
    }
}

/// Description of a link.
///
/// A bidirectional record stands for two independent directed edges, one per direction, each
/// with the full capacity of the record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub endpoints: (NodeId, NodeId),
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub unidirectional: bool,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl EdgeRecord {
    pub fn new(node1: NodeId, node2: NodeId) -> Self {
        Self {
            endpoints: (node1, node2),
            capacity: None,
            weight: None,
            unidirectional: false,
            enabled: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn unidirectional(mut self) -> Self {
        self.unidirectional = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = Some(false);
        self
    }

    /// Directed node pairs described by the record.
    pub fn directions(&self) -> Vec<(NodeId, NodeId)> {
        let (a, b) = self.endpoints;
        if self.unidirectional {
            vec![(a, b)]
        } else {
            vec![(a, b), (b, a)]
        }
    }
}

/// Target of a user event: a node id or a metric name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTarget {
    Node(NodeId),
    Metric(String),
}

fn default_trigger_type() -> String {
    "time".to_string()
}

/// Description of an administrative event, validated when the simulation is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserEventRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default = "default_trigger_type")]
    pub trigger_type: String,
    pub trigger_value: f64,
    #[serde(default)]
    pub event_target: Option<EventTarget>,
    #[serde(default)]
    pub effect_value: Option<f64>,
}

impl UserEventRecord {
    pub fn new(event_type: &str, time: f64) -> Self {
        Self {
            event_type: event_type.to_string(),
            trigger_type: default_trigger_type(),
            trigger_value: time,
            event_target: None,
            effect_value: None,
        }
    }

    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.event_target = Some(target);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.effect_value = Some(value);
        self
    }
}

fn default_metric() -> String {
    "Blocking_rate".to_string()
}

fn default_samples() -> usize {
    20
}

fn default_epsilon() -> f64 {
    1e-3
}

fn default_check_every() -> u64 {
    100
}

/// Convergence criterion of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    /// Tracked metric.
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Number of consecutive samples whose deviation is checked.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Standard deviation below which the metric is considered stable.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Number of admission outcomes between two samples.
    #[serde(default = "default_check_every")]
    pub check_every: u64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            samples: default_samples(),
            epsilon: default_epsilon(),
            check_every: default_check_every(),
        }
    }
}

/// Generated topology shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Ring { size: usize },
    FullMesh { size: usize },
    Torus2d { width: usize, height: usize },
    Torus3d { x: usize, y: usize, z: usize },
}

impl GeneratorConfig {
    pub fn generate(&self, ids: &mut IdAllocator) -> GeneratedTopology {
        match self {
            GeneratorConfig::Ring { size } => generators::ring(ids, *size),
            GeneratorConfig::FullMesh { size } => generators::full_mesh(ids, *size),
            GeneratorConfig::Torus2d { width, height } => generators::torus_2d(ids, *width, *height),
            GeneratorConfig::Torus3d { x, y, z } => generators::torus_3d(ids, *x, *y, *z),
        }
    }
}

/// YAML-serializable simulation config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub arrival_rate: f64,
    pub service_rate: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub max_arrivals: Option<u64>,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    /// Generated nodes and edges, placed before the explicit ones.
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub events: Vec<UserEventRecord>,
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Node and edge records of the generated topology followed by the explicit ones.
    ///
    /// Explicit node ids must not clash with the generated ones.
    pub fn topology_records(&self) -> Result<(Vec<NodeRecord>, Vec<EdgeRecord>)> {
        let mut ids = IdAllocator::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        if let Some(generator) = &self.generator {
            let generated = generator.generate(&mut ids);
            nodes.extend(generated.nodes);
            edges.extend(generated.edges);
        }
        for node in &self.nodes {
            ids.reserve(node.id)?;
            nodes.push(node.clone());
        }
        edges.extend(self.edges.iter().cloned());
        Ok((nodes, edges))
    }
}

impl FromStr for SimulationConfig {
    type Err = FlowsimError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }
}
