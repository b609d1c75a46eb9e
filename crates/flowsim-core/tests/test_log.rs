use flowsim_core::{log_debug, log_info, log_trace, SimulationState};

struct Clocked {
    state: SimulationState<u32>,
}

impl Clocked {
    fn time(&self) -> f64 {
        self.state.time()
    }

    fn name(&self) -> &str {
        "clocked"
    }
}

#[test]
fn test_macros_accept_plain_and_formatted_messages() {
    let mut clocked = Clocked {
        state: SimulationState::new(),
    };
    clocked.state.add_event(7, 2.);
    let event = clocked.state.next_event().unwrap();
    log_info!(clocked, "started");
    log_debug!(clocked, "handled event {} with payload {}", event.id, event.data);
    log_trace!(clocked, "{:?}", event);
    assert_eq!(clocked.time(), 2.);
}
