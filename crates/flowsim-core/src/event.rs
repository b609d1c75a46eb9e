//! Simulation event.

use std::cmp::Ordering;

/// Event identifier, assigned sequentially in the order events are added.
pub type EventId = u64;

/// Scheduled unit of work.
///
/// Events are ordered by their handling time and then by their identifier, so events
/// sharing the same time keep the order in which they were added.
#[derive(Clone, Debug)]
pub struct Event<T> {
    /// Unique event identifier.
    pub id: EventId,
    /// Absolute simulation time at which the event fires.
    pub time: f64,
    /// Event payload.
    pub data: T,
}

impl<T> Eq for Event<T> {}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Reversed order: BinaryHeap is a max-heap and the earliest event must come out first.
impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
