//! Error type shared by all simulator components.

use thiserror::Error;

use crate::flow::FlowId;
use crate::node::NodeId;

/// Errors raised by the simulator.
///
/// Only [`FlowsimError::NoPath`] is an expected outcome during a run: it is converted into a
/// blocked arrival. Every other variant aborts the run or the construction step that raised it.
#[derive(Debug, Error)]
pub enum FlowsimError {
    /// No path with spare capacity exists between two nodes.
    #[error("no path from node {src} to node {dst}")]
    NoPath { src: NodeId, dst: NodeId },

    /// An edge was over-allocated or a flow was freed from an edge it does not occupy.
    #[error("resource allocation error: {0}")]
    ResourceAllocation(String),

    /// The flow is not known to the flow controller.
    #[error("flow {0} is not registered")]
    NotRegisteredFlow(FlowId),

    /// A node with this id already exists.
    #[error("node {0} already exists")]
    DuplicatedNode(NodeId),

    /// No node with this id.
    #[error("no such node: {0}")]
    NoSuchNode(NodeId),

    /// No edge between the two nodes.
    #[error("no such edge: {0} -> {1}")]
    NoSuchEdge(NodeId, NodeId),

    /// Random endpoint selection failed to find two distinct eligible nodes.
    #[error("could not pick distinct entry and exit nodes: {0}")]
    Loop(String),

    /// The node has no free transmit or receive port slot.
    #[error("node {0} has no free port slot")]
    NoFreeSlot(NodeId),

    /// A parameter is out of its valid range.
    #[error("wrong parameter: {0}")]
    WrongParameter(String),

    /// A user event record names an unknown event type.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A user event record uses a trigger other than `time`.
    #[error("unsupported trigger type: {0}")]
    UnsupportedTrigger(String),

    /// A user event record lacks a field its type requires.
    #[error("event `{event}` requires field `{field}`")]
    MissingField { event: String, field: &'static str },

    /// The value has no registered update function or convergence tracker.
    #[error("value `{0}` is not registered")]
    NotRegisteredValue(String),

    /// The simulation was launched before its topology was set up.
    #[error("simulation is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, FlowsimError>;
