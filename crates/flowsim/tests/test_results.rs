mod common;
use common::assert_float_eq;

use flowsim::result::{Aggregate, ResultKey, ResultStore, UpdateFunction};
use flowsim::FlowsimError;

fn store_with_blocking_rate() -> ResultStore {
    let mut store = ResultStore::new();
    store.add_computed_value(
        "Blocking_rate",
        UpdateFunction::Ratio {
            numerator: "Flow_allocation_failure".to_string(),
            denominator: "Arrival".to_string(),
        },
        true,
    );
    store
}

#[test]
fn test_ratio_edge_cases() {
    let mut store = store_with_blocking_rate();
    assert!(store.get_general("Blocking_rate").is_nan());
    store.increase_value("Arrival", ResultKey::General, 1.);
    assert_eq!(store.get_general("Blocking_rate"), 0.);
    store.increase_value("Arrival", ResultKey::General, 3.);
    store.increase_value("Flow_allocation_failure", ResultKey::General, 1.);
    assert_float_eq(store.get_general("Blocking_rate"), 0.25, 1e-12);
    store.record_value("Arrival", ResultKey::General, 0.);
    assert!(store.get_general("Blocking_rate").is_nan());
}

#[test]
fn test_running_mean() {
    let mut store = ResultStore::new();
    store.add_computed_value(
        "mean_hops",
        UpdateFunction::Mean {
            count: "Flow_allocation_success".to_string(),
        },
        true,
    );
    assert!(store.get_general("mean_hops").is_nan());
    for hops in [1., 2., 3., 6.] {
        store.increase_value("Flow_allocation_success", ResultKey::General, 1.);
        store.update_computed_value("mean_hops", ResultKey::General, hops).unwrap();
    }
    assert_float_eq(store.get_general("mean_hops"), 3., 1e-12);
    assert!(matches!(
        store.update_computed_value("unknown", ResultKey::General, 1.),
        Err(FlowsimError::NotRegisteredValue(_))
    ));
}

#[test]
fn test_per_node_values_and_aggregates() {
    let mut store = store_with_blocking_rate();
    store.add_computed_value(
        "Mean_node_blocking_rate",
        UpdateFunction::NodeAggregate {
            value: "Blocking_rate".to_string(),
            aggregate: Aggregate::Mean,
        },
        false,
    );
    store.increase_value("Arrival", ResultKey::Node(0), 4.);
    store.increase_value("Flow_allocation_failure", ResultKey::Node(0), 1.);
    store.increase_value("Arrival", ResultKey::Node(1), 2.);
    store.increase_value("Flow_allocation_failure", ResultKey::Node(1), 1.);
    store.increase_value("End_flow", ResultKey::Node(2), 1.);

    assert_float_eq(store.get(ResultKey::Node(0), "Blocking_rate"), 0.25, 1e-12);
    assert_float_eq(store.get_general("Mean_node_blocking_rate"), 0.375, 1e-12);
    assert_float_eq(store.process_nodes_value("Blocking_rate", Aggregate::Max), 0.5, 1e-12);
    assert_float_eq(store.process_nodes_value("Arrival", Aggregate::Sum), 6., 1e-12);
    assert_float_eq(store.process_nodes_value("Arrival", Aggregate::Min), 0., 1e-12);

    let node = store.node_results(1);
    assert_eq!(node.get("Arrival"), Some(&2.));
    assert_float_eq(node["Blocking_rate"], 0.5, 1e-12);
    assert!(!node.contains_key("Mean_node_blocking_rate"));
    assert!(store.general_results().contains_key("Mean_node_blocking_rate"));
}

#[test]
fn test_convergence_tracking() {
    let mut store = ResultStore::new();
    assert!(matches!(
        store.check_convergence("x"),
        Err(FlowsimError::NotRegisteredValue(_))
    ));
    store.register_convergence("x", 3, 0.1).unwrap();
    for sample in [9., 3., 3.1] {
        assert!(!store.check_convergence_with("x", sample).unwrap());
    }
    store.check_convergence_with("x", 3.1).unwrap();
    store.check_convergence_with("x", 3.).unwrap();
    assert!(store.check_convergence_with("x", 3.).unwrap());

    store.record_value("x", ResultKey::General, 3.05);
    assert!(store.check_convergence("x").unwrap());
    assert_eq!(store.convergence_tracker("x").unwrap().samples(), &[3.05, 3., 3.]);
}

#[test]
fn test_samples_and_snapshots() {
    let mut store = ResultStore::new();
    store.increase_value("Arrival", ResultKey::General, 1.);
    store.record_sample("Arrival", 1.5);
    store.increase_value("Arrival", ResultKey::General, 1.);
    store.record_sample("Arrival", 3.);
    assert_eq!(store.samples("Arrival"), &[(1.5, 1.), (3., 2.)]);
    assert!(store.samples("missing").is_empty());

    store.increase_value("End_flow", ResultKey::General, 5.);
    let snapshot = store.take_snapshot("partial", 4., &["Arrival"]);
    assert_eq!(snapshot.values.len(), 1);
    let snapshot = store.take_snapshot("full", 4., &[]);
    assert_eq!(snapshot.get("End_flow"), Some(5.));
    assert_eq!(store.snapshots().len(), 2);
    assert_eq!(store.snapshot("partial").unwrap().time, 4.);
}
