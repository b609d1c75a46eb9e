use rstest::rstest;

use flowsim::edge::Edge;
use flowsim::node::{Node, NodeRole};
use flowsim::{FlowController, FlowsimError, Topology};

fn line(count: usize, capacity: usize) -> Topology {
    let mut topology = Topology::new();
    for id in 0..count {
        topology.add_node(Node::new(id, 1., 1.).unwrap()).unwrap();
    }
    for id in 1..count {
        topology.add_edge(id - 1, id, Edge::new(capacity, 1.)).unwrap();
    }
    topology
}

#[test]
fn test_duplicated_node_adds_nothing() {
    let mut topology = Topology::new();
    let nodes = vec![
        Node::new(0, 1., 1.).unwrap(),
        Node::new(1, 1., 1.).unwrap(),
        Node::new(0, 2., 2.).unwrap(),
    ];
    assert!(matches!(topology.add_nodes(nodes), Err(FlowsimError::DuplicatedNode(0))));
    assert_eq!(topology.node_count(), 0);

    topology.add_node(Node::new(5, 1., 1.).unwrap()).unwrap();
    assert!(matches!(
        topology.add_node(Node::new(5, 1., 1.).unwrap()),
        Err(FlowsimError::DuplicatedNode(5))
    ));
}

#[test]
fn test_edge_to_unknown_node() {
    let mut topology = line(2, 1);
    assert!(matches!(
        topology.add_edge(0, 7, Edge::new(1, 1.)),
        Err(FlowsimError::NoSuchNode(7))
    ));
    assert!(matches!(topology.edge(1, 0), Err(FlowsimError::NoSuchEdge(1, 0))));
    assert!(topology.add_edge(0, 0, Edge::new(1, 1.)).is_err());
    assert!(topology.add_edge(0, 1, Edge::new(0, 1.)).is_err());
}

#[test]
fn test_second_edge_makes_meta_edge() {
    let mut topology = line(2, 1);
    topology.add_edge(0, 1, Edge::new(2, 0.5)).unwrap();
    let meta = topology.edge(0, 1).unwrap();
    assert_eq!(meta.len(), 2);
    assert_eq!(meta.weight(), 0.5);
    assert_eq!(meta.capacity(), 3);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn test_allocations_respect_capacity(#[case] capacity: usize) {
    let mut topology = line(3, capacity);
    let mut controller = FlowController::new();
    let mut flows = Vec::new();
    for _ in 0..capacity {
        flows.push(controller.allocate_flow(&mut topology, 0, 2).unwrap());
        let meta = topology.edge(0, 1).unwrap();
        assert_eq!(meta.available_capacity(), capacity - flows.len());
        assert_eq!(meta.flow_count(), flows.len());
    }
    assert!(matches!(
        controller.allocate_flow(&mut topology, 0, 2),
        Err(FlowsimError::NoPath { src: 0, dst: 2 })
    ));
    for flow in flows {
        controller.free_flow(&mut topology, flow.id()).unwrap();
    }
    for (from, to, meta) in topology.edges() {
        assert_eq!(meta.available_capacity(), capacity, "edge {} -> {}", from, to);
        assert_eq!(meta.weight(), 1.);
    }
}

#[test]
fn test_routing_avoids_saturated_and_disabled_edges() {
    let mut topology = line(3, 1);
    topology.add_edge(0, 2, Edge::new(1, 5.)).unwrap();
    assert_eq!(topology.shortest_path(0, 2).unwrap().nodes, vec![0, 1, 2]);

    let mut controller = FlowController::new();
    let flow = controller.allocate_flow(&mut topology, 0, 1).unwrap();
    assert_eq!(topology.shortest_path(0, 2).unwrap().nodes, vec![0, 2]);
    controller.free_flow(&mut topology, flow.id()).unwrap();

    assert!(topology.set_edge_enabled(1, 2, false).unwrap());
    assert_eq!(topology.shortest_path(0, 2).unwrap().nodes, vec![0, 2]);
    assert!(topology.set_edge_enabled(0, 2, false).unwrap());
    assert!(matches!(
        controller.allocate_flow(&mut topology, 0, 2),
        Err(FlowsimError::NoPath { .. })
    ));
    assert!(!topology.set_edge_enabled(0, 2, false).unwrap());
    assert!(topology.set_edge_enabled(1, 2, true).unwrap());
    assert_eq!(topology.shortest_path(0, 2).unwrap().nodes, vec![0, 1, 2]);
}

#[test]
fn test_disable_occupied_edge_fails() {
    let mut topology = line(2, 1);
    let mut controller = FlowController::new();
    controller.allocate_flow(&mut topology, 0, 1).unwrap();
    assert!(matches!(
        topology.set_edge_enabled(0, 1, false),
        Err(FlowsimError::ResourceAllocation(_))
    ));
}

#[test]
fn test_port_slots_limit_edges() {
    let mut topology = Topology::new();
    topology
        .add_node(Node::new(0, 1., 1.).unwrap().with_slots(Some(1), Some(0)))
        .unwrap();
    topology.add_node(Node::new(1, 1., 1.).unwrap()).unwrap();
    topology.add_node(Node::new(2, 1., 1.).unwrap()).unwrap();

    topology.add_edge(0, 1, Edge::new(1, 1.)).unwrap();
    assert!(matches!(
        topology.add_edge(0, 2, Edge::new(1, 1.)),
        Err(FlowsimError::NoFreeSlot(0))
    ));
    assert!(matches!(
        topology.add_edge(1, 0, Edge::new(1, 1.)),
        Err(FlowsimError::NoFreeSlot(0))
    ));
    // disabled edges hold no slots
    topology.add_edge(0, 2, Edge::new(1, 1.).disabled()).unwrap();
    assert!(matches!(
        topology.set_edge_enabled(0, 2, true),
        Err(FlowsimError::NoFreeSlot(0))
    ));

    topology.remove_edge(0, 1, false).unwrap();
    assert!(!topology.has_edge(0, 1));
    assert!(topology.set_edge_enabled(0, 2, true).unwrap());
    assert_eq!(topology.node(0).unwrap().tx_slots().available(), Some(0));
}

#[test]
fn test_forced_removal_evicts_flows() {
    let mut topology = line(3, 2);
    let mut controller = FlowController::new();
    let flow = controller.allocate_flow(&mut topology, 0, 2).unwrap();

    assert!(matches!(
        topology.remove_edge(1, 2, false),
        Err(FlowsimError::ResourceAllocation(_))
    ));
    let evicted = topology.remove_edge(1, 2, true).unwrap();
    assert_eq!(evicted, vec![flow.id()]);
    assert!(!topology.has_edge(1, 2));

    controller.free_flow(&mut topology, flow.id()).unwrap();
    assert_eq!(topology.edge(0, 1).unwrap().available_capacity(), 2);
    assert!(matches!(
        controller.free_flow(&mut topology, flow.id()),
        Err(FlowsimError::NotRegisteredFlow(_))
    ));
}

#[test]
fn test_roles() {
    let mut topology = Topology::new();
    topology
        .add_node(Node::new(0, 1., 1.).unwrap().with_role(NodeRole::Entry))
        .unwrap();
    topology
        .add_node(Node::new(1, 1., 1.).unwrap().with_role(NodeRole::Exit))
        .unwrap();
    topology
        .add_node(Node::new(2, 1., 1.).unwrap().with_role(NodeRole::Transit))
        .unwrap();
    topology.add_node(Node::new(3, 1., 1.).unwrap()).unwrap();
    assert_eq!(topology.entry_nodes(), vec![0, 3]);
    assert_eq!(topology.exit_nodes(), vec![1, 3]);
}
