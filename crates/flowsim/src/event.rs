//! Simulation events.

use serde::Serialize;

use crate::config::{EventTarget, UserEventRecord};
use crate::error::{FlowsimError, Result};
use crate::flow::FlowId;
use crate::node::NodeId;

/// Component which produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Issuer {
    Node(NodeId),
    Controller,
    User,
}

/// Overrides the arrival rate of a node, or restores it when `rate` is `None`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrivalBurst {
    pub node: NodeId,
    pub rate: Option<f64>,
}

/// Records the current value of a metric and repeats every `interval`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub metric: String,
    pub interval: f64,
}

/// Runs the load-rebalancing heuristic with the given imbalance threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reconfigure {
    pub threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum EventKind {
    Arrival,
    EndFlow { flow: FlowId },
    AllocationSuccess { flow: FlowId, hops: usize },
    AllocationFailure,
    EndOfSimulation,
    ArrivalBurst(ArrivalBurst),
    Sample(Sample),
    Reconfigure(Reconfigure),
    Watcher,
}

impl EventKind {
    /// Name of the counter incremented when an event of this kind is handled.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Arrival => "Arrival",
            EventKind::EndFlow { .. } => "End_flow",
            EventKind::AllocationSuccess { .. } => "Flow_allocation_success",
            EventKind::AllocationFailure => "Flow_allocation_failure",
            EventKind::EndOfSimulation => "End_of_simulation",
            EventKind::ArrivalBurst(_) => "Arrival_burst",
            EventKind::Sample(_) => "Sample",
            EventKind::Reconfigure(_) => "Reconfigure",
            EventKind::Watcher => "Watcher",
        }
    }

    /// Admission outcomes drive the convergence checks.
    pub fn is_outcome(&self) -> bool {
        matches!(self, EventKind::AllocationSuccess { .. } | EventKind::AllocationFailure)
    }
}

/// Payload of every event in the simulation queue.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowEvent {
    pub issuer: Issuer,
    pub kind: EventKind,
}

impl FlowEvent {
    pub fn new(issuer: Issuer, kind: EventKind) -> Self {
        Self { issuer, kind }
    }

    /// User events keep the run alive after convergence. Samples repeat forever and are not
    /// counted as such.
    pub fn is_counted_user_event(&self) -> bool {
        self.issuer == Issuer::User && !self.is_sample()
    }

    pub fn is_sample(&self) -> bool {
        matches!(self.kind, EventKind::Sample(_))
    }
}

/// Validated administrative event with its absolute trigger time.
#[derive(Clone, Debug, PartialEq)]
pub struct UserEvent {
    pub time: f64,
    pub kind: EventKind,
}

impl UserEvent {
    /// Node the event refers to, if any.
    pub fn target_node(&self) -> Option<NodeId> {
        match &self.kind {
            EventKind::ArrivalBurst(burst) => Some(burst.node),
            _ => None,
        }
    }
}

impl TryFrom<&UserEventRecord> for UserEvent {
    type Error = FlowsimError;

    fn try_from(record: &UserEventRecord) -> Result<Self> {
        if !record.trigger_type.eq_ignore_ascii_case("time") {
            return Err(FlowsimError::UnsupportedTrigger(record.trigger_type.clone()));
        }
        let time = record.trigger_value;
        if !time.is_finite() || time < 0. {
            return Err(FlowsimError::WrongParameter(format!(
                "event `{}` has invalid trigger time {}",
                record.event_type, time
            )));
        }
        let missing = |field| FlowsimError::MissingField {
            event: record.event_type.clone(),
            field,
        };
        let kind = match record.event_type.to_ascii_lowercase().as_str() {
            "arrival_burst" => match &record.event_target {
                Some(EventTarget::Node(node)) => EventKind::ArrivalBurst(ArrivalBurst {
                    node: *node,
                    rate: record.effect_value,
                }),
                _ => return Err(missing("event_target")),
            },
            "sample" => {
                let interval = record.effect_value.ok_or_else(|| missing("effect_value"))?;
                if !(interval.is_finite() && interval > 0.) {
                    return Err(FlowsimError::WrongParameter(format!(
                        "sample interval must be positive, got {}",
                        interval
                    )));
                }
                let metric = match &record.event_target {
                    Some(EventTarget::Metric(metric)) => metric.clone(),
                    Some(EventTarget::Node(_)) => return Err(missing("event_target")),
                    None => "Blocking_rate".to_string(),
                };
                EventKind::Sample(Sample { metric, interval })
            }
            "reconfigure" | "reconfigure_topology" => EventKind::Reconfigure(Reconfigure {
                threshold: record.effect_value.ok_or_else(|| missing("effect_value"))?,
            }),
            "watcher" => EventKind::Watcher,
            "end_of_simulation" => EventKind::EndOfSimulation,
            _ => return Err(FlowsimError::UnknownEventType(record.event_type.clone())),
        };
        Ok(Self { time, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_validation() {
        let burst = UserEventRecord::new("Arrival_burst", 10.)
            .with_target(EventTarget::Node(2))
            .with_value(5.);
        let event = UserEvent::try_from(&burst).unwrap();
        assert_eq!(event.time, 10.);
        assert_eq!(event.target_node(), Some(2));

        let unknown = UserEventRecord::new("explode", 1.);
        assert!(matches!(
            UserEvent::try_from(&unknown),
            Err(FlowsimError::UnknownEventType(_))
        ));

        let mut trigger = UserEventRecord::new("watcher", 1.);
        trigger.trigger_type = "event_count".to_string();
        assert!(matches!(
            UserEvent::try_from(&trigger),
            Err(FlowsimError::UnsupportedTrigger(_))
        ));

        let no_target = UserEventRecord::new("arrival_burst", 1.);
        assert!(matches!(
            UserEvent::try_from(&no_target),
            Err(FlowsimError::MissingField { field: "event_target", .. })
        ));
    }

    #[test]
    fn test_sample_defaults_to_blocking_rate() {
        let record = UserEventRecord::new("sample", 0.).with_value(2.);
        let event = UserEvent::try_from(&record).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Sample(Sample {
                metric: "Blocking_rate".to_string(),
                interval: 2.
            })
        );
        assert!(FlowEvent::new(Issuer::User, event.kind).is_sample());
    }
}
