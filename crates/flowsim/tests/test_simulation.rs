mod common;
use common::{assert_float_eq, edge_records, node_records};

use rstest::rstest;

use flowsim::config::NodeRecord;
use flowsim::{FlowsimError, Simulation, SimulationConfig};

fn config_path(name: &str) -> String {
    format!("{}/test-configs/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn test_two_nodes_blocking_rate(#[case] seed: u64) {
    let mut sim = Simulation::new(0.9, 0.9, Some(seed));
    sim.set_max_arrivals(Some(500_000));
    sim.init_simulation(&node_records(2), &edge_records(&[(0, 1)])).unwrap();
    let results = sim.launch_simulation().unwrap();
    assert_float_eq(results.get("Blocking_rate").unwrap(), 0.5, 0.05);
    assert_float_eq(results.get("mean_hops").unwrap(), 1., 1e-12);
    assert!(sim.event_scheduler().unwrap().has_converged());
}

#[rstest]
#[case(5)]
#[case(6)]
fn test_triangle_blocking_rate(#[case] seed: u64) {
    let config = SimulationConfig::from_file(config_path("triangle.yaml")).unwrap();
    let mut sim = Simulation::from_config(&config).unwrap();
    sim.set_seed(seed);
    sim.reset(None, None).unwrap();
    let results = sim.launch_simulation().unwrap();
    assert_float_eq(results.get("Blocking_rate").unwrap(), 0.29, 0.05);
    let mean_hops = results.get("mean_hops").unwrap();
    assert!(mean_hops > 1. && mean_hops < 2.);
}

#[test]
fn test_duplicated_node_ids() {
    let mut sim = Simulation::new(1., 1., Some(1));
    let nodes = vec![NodeRecord::new(0), NodeRecord::new(1), NodeRecord::new(1)];
    assert!(matches!(
        sim.init_simulation(&nodes, &[]),
        Err(FlowsimError::DuplicatedNode(1))
    ));
    assert!(matches!(sim.topology(), Err(FlowsimError::NotInitialized)));
}

#[test]
fn test_not_initialized() {
    let mut sim = Simulation::new(1., 1., None);
    assert!(matches!(sim.launch_simulation(), Err(FlowsimError::NotInitialized)));
    assert!(matches!(sim.step(), Err(FlowsimError::NotInitialized)));
    assert!(matches!(sim.reset(Some(2.), None), Err(FlowsimError::NotInitialized)));
    assert_eq!(sim.time(), 0.);
}

#[test]
fn test_edge_to_unknown_node() {
    let mut sim = Simulation::new(1., 1., Some(1));
    assert!(matches!(
        sim.init_simulation(&node_records(2), &edge_records(&[(0, 5)])),
        Err(FlowsimError::NoSuchNode(5))
    ));
}

#[test]
fn test_clone_replays_same_run() {
    let mut sim = Simulation::new(0.9, 0.9, Some(21));
    sim.set_max_arrivals(Some(3000));
    sim.init_simulation(&node_records(3), &edge_records(&[(0, 1), (1, 2)])).unwrap();
    let mut copy = sim.clone();
    let first = sim.launch_simulation().unwrap();
    let second = copy.launch_simulation().unwrap();
    assert_eq!(first.time, second.time);
    assert_eq!(first.get("Arrival"), second.get("Arrival"));
    assert_eq!(first.get("Blocking_rate"), second.get("Blocking_rate"));
    assert_eq!(first.get("Flow_allocation_success"), second.get("Flow_allocation_success"));
}

#[test]
fn test_reset_with_new_rates() {
    let mut sim = Simulation::new(0.9, 0.9, Some(8));
    sim.set_max_arrivals(Some(20_000));
    sim.init_simulation(&node_records(2), &edge_records(&[(0, 1)])).unwrap();
    let busy = sim.launch_simulation().unwrap().get("Blocking_rate").unwrap();

    sim.reset(Some(0.1), None).unwrap();
    assert_eq!(sim.arrival_rate(), 0.1);
    assert_eq!(sim.time(), 0.);
    assert_eq!(sim.results().unwrap().get_general("Arrival"), 0.);
    let idle = sim.launch_simulation().unwrap().get("Blocking_rate").unwrap();
    assert!(idle < 0.2);
    assert!(idle < busy);
}

#[test]
fn test_config_with_events() {
    let config = SimulationConfig::from_file(config_path("events.yaml")).unwrap();
    let mut sim = Simulation::from_config(&config).unwrap();
    assert_eq!(sim.seed(), 3);
    {
        let topology = sim.topology().unwrap();
        assert_eq!(topology.node(0).unwrap().name(), "gateway");
        assert_eq!(topology.node(1).unwrap().service_rate(), 1.5);
        assert!(!topology.is_active(0, 1));
        assert!(!topology.has_edge(1, 2));
        assert_eq!(topology.node(0).unwrap().tx_slots().used(), 1);
    }
    let results = sim.launch_simulation().unwrap();
    assert_eq!(results.time, 100.);
    assert_eq!(results.get("Arrival_burst"), Some(2.));
    assert!(results.get("Arrival").unwrap() > 0.);
    assert_eq!(results.get("mean_hops"), Some(2.));

    let store = sim.results().unwrap();
    assert_eq!(store.node_results(0)["Arrival"], results.get("Arrival").unwrap());
    let samples = store.samples("Blocking_rate");
    assert!(samples.len() >= 19 && samples.len() <= 21);
    assert_eq!(sim.topology().unwrap().node(0).unwrap().arrival_rate(), 0.);
}

#[test]
fn test_generated_topology_run() {
    let config = SimulationConfig::from_file(config_path("torus.yaml")).unwrap();
    let mut sim = Simulation::from_config(&config).unwrap();
    assert_eq!(sim.topology().unwrap().node_count(), 10);
    let results = sim.launch_simulation().unwrap();
    assert_eq!(results.get("Arrival"), Some(2000.));
    let blocking_rate = results.get("Blocking_rate").unwrap();
    assert!((0. ..=1.).contains(&blocking_rate));
    assert_eq!(sim.event_scheduler().unwrap().controller().flow_count(), 0);
}
