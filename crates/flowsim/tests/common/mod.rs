#![allow(dead_code)]

use flowsim::config::{EdgeRecord, NodeRecord};

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "Values do not match: {:.6} vs {:.6}", x, y);
}

pub fn node_records(count: usize) -> Vec<NodeRecord> {
    (0..count).map(NodeRecord::new).collect()
}

pub fn edge_records(pairs: &[(usize, usize)]) -> Vec<EdgeRecord> {
    pairs.iter().map(|(a, b)| EdgeRecord::new(*a, *b)).collect()
}
