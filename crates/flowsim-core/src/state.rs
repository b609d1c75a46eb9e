//! Virtual clock and pending event queue.

use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::event::{Event, EventId};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

/// Holds the simulation clock and the events which are not handled yet.
///
/// Time only moves forward when an event is taken from the queue with
/// [`next_event`](Self::next_event): the clock is then set to the handling time of that event.
#[derive(Clone)]
pub struct SimulationState<T> {
    clock: f64,
    events: BinaryHeap<Event<T>>,
    event_count: u64,
}

impl<T: Debug> Default for SimulationState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> SimulationState<T> {
    /// Creates an empty state with the clock set to zero.
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            events: BinaryHeap::new(),
            event_count: 0,
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Adds a new event which fires `delay` time units after the current time.
    ///
    /// Panics if `delay` is negative: events cannot be added to the past.
    pub fn add_event(&mut self, data: T, delay: f64) -> EventId {
        let event_id = self.event_count;
        let event = Event {
            id: event_id,
            time: self.clock + delay.max(0.),
            data,
        };
        if delay >= -EPSILON {
            self.events.push(event);
            self.event_count += 1;
            event_id
        } else {
            log_incorrect_event(&event, &format!("negative delay {}", delay));
            panic!("Event delay is negative! It is not allowed to add events from the past.");
        }
    }

    /// Adds a new event which fires at the absolute simulation time `time`.
    ///
    /// Panics if `time` is earlier than the current time.
    pub fn add_event_at(&mut self, data: T, time: f64) -> EventId {
        let delay = time - self.clock;
        self.add_event(data, delay)
    }

    /// Removes the earliest pending event from the queue and advances the clock to its time.
    ///
    /// Returns `None` if there are no pending events, the clock is left unchanged then.
    pub fn next_event(&mut self) -> Option<Event<T>> {
        let event = self.events.pop()?;
        self.clock = event.time;
        Some(event)
    }

    /// Returns the earliest pending event without removing it.
    pub fn peek_event(&self) -> Option<&Event<T>> {
        self.events.peek()
    }

    /// Returns the number of pending events.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if there are no pending events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the total number of events added so far.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Returns the pending events in the order they are going to be handled.
    pub fn dump_events(&self) -> Vec<&Event<T>> {
        let mut output: Vec<&Event<T>> = self.events.iter().collect();
        output.sort();
        // Because the sorting order of events is inverted to be used with BinaryHeap
        output.reverse();
        output
    }
}
