//! Result store: counters, computed metrics, convergence trackers and snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FlowsimError, Result};
use crate::node::NodeId;

/// Source a value is recorded for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultKey {
    General,
    Node(NodeId),
}

/// Aggregation applied to the per-node values of a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Mean,
    Min,
    Max,
}

impl Aggregate {
    fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// How a computed value is obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateFunction {
    /// Running mean of the pushed elements, `count` names the counter of pushed elements
    /// (incremented by the caller before each push).
    Mean { count: String },
    /// `numerator / denominator`, evaluated on every read.
    Ratio { numerator: String, denominator: String },
    /// Aggregate of `value` over all node sources, evaluated on every read.
    NodeAggregate { value: String, aggregate: Aggregate },
}

impl UpdateFunction {
    fn evaluated_on_get(&self) -> bool {
        !matches!(self, UpdateFunction::Mean { .. })
    }
}

#[derive(Clone, Debug)]
struct ComputedValue {
    function: UpdateFunction,
    per_node: bool,
}

/// Circular buffer of the latest samples of a metric.
///
/// Unfilled slots hold NaN, so the container never reports convergence before it has seen
/// as many samples as it holds.
#[derive(Clone, Debug)]
pub struct SampleContainer {
    samples: Vec<f64>,
    counter: usize,
    epsilon: f64,
}

impl SampleContainer {
    pub fn new(number_samples: usize, epsilon: f64) -> Result<Self> {
        if number_samples == 0 {
            return Err(FlowsimError::WrongParameter(
                "convergence needs at least one sample".to_string(),
            ));
        }
        if epsilon.is_nan() || epsilon <= 0. {
            return Err(FlowsimError::WrongParameter(format!(
                "convergence epsilon must be positive, got {}",
                epsilon
            )));
        }
        Ok(Self {
            samples: vec![f64::NAN; number_samples],
            counter: 0,
            epsilon,
        })
    }

    pub fn update_samples(&mut self, sample: f64) {
        self.samples[self.counter] = sample;
        self.counter = (self.counter + 1) % self.samples.len();
    }

    /// Population standard deviation of the held samples.
    pub fn standard_deviation(&self) -> f64 {
        let n = self.samples.len() as f64;
        let mean = self.samples.iter().sum::<f64>() / n;
        let variance = self.samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        variance.sqrt()
    }

    pub fn has_converged(&self) -> bool {
        self.standard_deviation() < self.epsilon
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

/// Values of selected metrics taken at some simulation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub values: BTreeMap<String, f64>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Two-level mapping from (source, metric name) to a value.
///
/// A value is either recorded/incremented directly or computed with a registered
/// [`UpdateFunction`]. Reading a missing plain value gives zero.
#[derive(Clone, Debug, Default)]
pub struct ResultStore {
    results: BTreeMap<ResultKey, BTreeMap<String, f64>>,
    computed: BTreeMap<String, ComputedValue>,
    convergence: BTreeMap<String, SampleContainer>,
    user_samples: BTreeMap<String, Vec<(f64, f64)>>,
    snapshots: BTreeMap<String, Snapshot>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increase_value(&mut self, name: &str, key: ResultKey, increment: f64) {
        *self.entry(key, name) += increment;
    }

    pub fn record_value(&mut self, name: &str, key: ResultKey, value: f64) {
        *self.entry(key, name) = value;
    }

    fn entry(&mut self, key: ResultKey, name: &str) -> &mut f64 {
        self.results
            .entry(key)
            .or_default()
            .entry(name.to_string())
            .or_insert(0.)
    }

    /// Registers a computed value. With `per_node` set it is also reported for every node source.
    pub fn add_computed_value(&mut self, name: &str, function: UpdateFunction, per_node: bool) {
        self.computed
            .insert(name.to_string(), ComputedValue { function, per_node });
    }

    /// Pushes a new element into a computed value and returns its new value.
    pub fn update_computed_value(&mut self, name: &str, key: ResultKey, new_element: f64) -> Result<f64> {
        let computed = self
            .computed
            .get(name)
            .ok_or_else(|| FlowsimError::NotRegisteredValue(name.to_string()))?;
        let value = match &computed.function {
            UpdateFunction::Mean { count } => {
                let n = self.raw(key, count).unwrap_or(0.);
                match self.raw(key, name) {
                    Some(mean) if n > 1. => (mean * (n - 1.) + new_element) / n,
                    _ => new_element,
                }
            }
            _ => self.get(key, name),
        };
        self.record_value(name, key, value);
        Ok(value)
    }

    fn raw(&self, key: ResultKey, name: &str) -> Option<f64> {
        self.results.get(&key).and_then(|m| m.get(name)).copied()
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.computed.contains_key(name)
    }

    pub fn get(&self, key: ResultKey, name: &str) -> f64 {
        match self.computed.get(name) {
            Some(computed) if computed.function.evaluated_on_get() => self.evaluate(key, &computed.function),
            Some(_) => self.raw(key, name).unwrap_or(f64::NAN),
            None => self.raw(key, name).unwrap_or(0.),
        }
    }

    pub fn get_general(&self, name: &str) -> f64 {
        self.get(ResultKey::General, name)
    }

    fn evaluate(&self, key: ResultKey, function: &UpdateFunction) -> f64 {
        match function {
            UpdateFunction::Ratio { numerator, denominator } => {
                let num = self.raw(key, numerator).unwrap_or(0.);
                match self.raw(key, denominator) {
                    Some(den) if den != 0. => num / den,
                    _ => f64::NAN,
                }
            }
            UpdateFunction::NodeAggregate { value, aggregate } => self.process_nodes_value(value, *aggregate),
            UpdateFunction::Mean { .. } => f64::NAN,
        }
    }

    /// Aggregates a metric over all node sources, NaN values are skipped.
    pub fn process_nodes_value(&self, name: &str, aggregate: Aggregate) -> f64 {
        let values: Vec<f64> = self
            .sources()
            .filter(|key| *key != ResultKey::General)
            .map(|key| self.get(key, name))
            .filter(|v| !v.is_nan())
            .collect();
        aggregate.apply(&values)
    }

    /// Sources that have at least one recorded value.
    pub fn sources(&self) -> impl Iterator<Item = ResultKey> + '_ {
        self.results.keys().copied()
    }

    /// All general values, computed values included.
    pub fn general_results(&self) -> BTreeMap<String, f64> {
        let mut values = self.results.get(&ResultKey::General).cloned().unwrap_or_default();
        for name in self.computed.keys() {
            values.insert(name.clone(), self.get_general(name));
        }
        values
    }

    /// All values of a node, per-node computed values included.
    pub fn node_results(&self, node: NodeId) -> BTreeMap<String, f64> {
        let key = ResultKey::Node(node);
        let mut values = self.results.get(&key).cloned().unwrap_or_default();
        for (name, computed) in &self.computed {
            if computed.per_node {
                values.insert(name.clone(), self.get(key, name));
            }
        }
        values
    }

    pub fn register_convergence(&mut self, name: &str, number_samples: usize, epsilon: f64) -> Result<()> {
        let container = SampleContainer::new(number_samples, epsilon)?;
        self.convergence.insert(name.to_string(), container);
        Ok(())
    }

    /// Pushes the current general value of `name` into its tracker and evaluates convergence.
    pub fn check_convergence(&mut self, name: &str) -> Result<bool> {
        let value = self.get_general(name);
        self.check_convergence_with(name, value)
    }

    pub fn check_convergence_with(&mut self, name: &str, sample: f64) -> Result<bool> {
        let container = self
            .convergence
            .get_mut(name)
            .ok_or_else(|| FlowsimError::NotRegisteredValue(name.to_string()))?;
        container.update_samples(sample);
        Ok(container.has_converged())
    }

    pub fn convergence_tracker(&self, name: &str) -> Option<&SampleContainer> {
        self.convergence.get(name)
    }

    /// Appends the current general value of `name` to its user sample series.
    pub fn record_sample(&mut self, name: &str, time: f64) {
        let value = self.get_general(name);
        self.user_samples.entry(name.to_string()).or_default().push((time, value));
    }

    /// User samples of `name` as `(time, value)` pairs.
    pub fn samples(&self, name: &str) -> &[(f64, f64)] {
        self.user_samples.get(name).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Stores the general values of `names` (all general values if empty) under `label`.
    pub fn take_snapshot(&mut self, label: &str, time: f64, names: &[&str]) -> &Snapshot {
        let values = if names.is_empty() {
            self.general_results()
        } else {
            names
                .iter()
                .map(|name| (name.to_string(), self.get_general(name)))
                .collect()
        };
        self.snapshots.insert(label.to_string(), Snapshot { time, values });
        &self.snapshots[label]
    }

    pub fn snapshot(&self, label: &str) -> Option<&Snapshot> {
        self.snapshots.get(label)
    }

    pub fn snapshots(&self) -> &BTreeMap<String, Snapshot> {
        &self.snapshots
    }
}
