use flowsim_core::{SimulationState, EPSILON};

#[derive(Clone, Debug, PartialEq)]
enum Payload {
    Ping(u32),
    Pong(u32),
}

#[test]
fn test_events_are_handled_in_time_order() {
    let mut state = SimulationState::new();
    state.add_event(Payload::Ping(3), 3.0);
    state.add_event(Payload::Ping(1), 1.0);
    state.add_event(Payload::Ping(2), 2.5);

    let mut times = Vec::new();
    while let Some(event) = state.next_event() {
        times.push(event.time);
        assert!((state.time() - event.time).abs() < EPSILON);
    }
    assert_eq!(times, vec![1.0, 2.5, 3.0]);
    assert!(state.is_empty());
}

#[test]
fn test_equal_times_keep_insertion_order() {
    let mut state = SimulationState::new();
    for i in 0..5 {
        state.add_event(Payload::Ping(i), 1.0);
        state.add_event(Payload::Pong(i), 0.0);
    }
    let mut order = Vec::new();
    while let Some(event) = state.next_event() {
        order.push(event.data);
    }
    let expected: Vec<Payload> = (0..5)
        .map(Payload::Pong)
        .chain((0..5).map(Payload::Ping))
        .collect();
    assert_eq!(order, expected);
}

#[test]
fn test_delay_is_relative_to_current_time() {
    let mut state = SimulationState::new();
    state.add_event(Payload::Ping(0), 2.0);
    state.next_event();
    let id = state.add_event(Payload::Ping(1), 1.5);
    assert_eq!(id, 1);
    assert_eq!(state.peek_event().map(|e| e.time), Some(3.5));
    state.add_event_at(Payload::Ping(2), 2.0);
    assert_eq!(state.pending(), 2);
    assert_eq!(state.event_count(), 3);
    let dump: Vec<f64> = state.dump_events().iter().map(|e| e.time).collect();
    assert_eq!(dump, vec![2.0, 3.5]);
}

#[test]
fn test_empty_queue_keeps_clock() {
    let mut state: SimulationState<Payload> = SimulationState::default();
    state.add_event(Payload::Pong(0), 4.0);
    state.next_event();
    assert!(state.next_event().is_none());
    assert_eq!(state.time(), 4.0);
}

#[test]
#[should_panic]
fn test_event_in_the_past_panics() {
    let mut state = SimulationState::new();
    state.add_event(Payload::Ping(0), 5.0);
    state.next_event();
    state.add_event_at(Payload::Ping(1), 1.0);
}
