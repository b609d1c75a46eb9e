#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod event;
pub mod log;
pub mod state;

pub use colored;
pub use event::{Event, EventId};
pub use state::{SimulationState, EPSILON};
