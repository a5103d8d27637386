//! Shared test utilities for pipeline testing.

use crate::graph::{Graph, Link, Node};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Build a node with the given groups.
pub fn node(id: &str, groups: &[&str]) -> Node {
    Node {
        id: id.to_string(),
        groups: groups.iter().map(|s| s.to_string()).collect(),
    }
}

/// Build a single-attrib link.
pub fn link(a: &str, b: &str, weight: f64, attrib: &str) -> Link {
    Link::new(a, b, vec![weight], vec![attrib.to_string()])
}

/// A graph of two disjoint, fully connected triangles with grouped nodes.
pub fn two_triangles() -> Graph {
    let mut graph = Graph::new("triangles");
    for (id, group) in [
        ("a", "lean group"),
        ("b", "lean group"),
        ("c", "lean group"),
        ("x", "obese group"),
        ("y", "obese group"),
        ("z", "obese group"),
    ] {
        graph.data.nodes.push(node(id, &[group]));
    }
    for (s, t) in [("a", "b"), ("b", "c"), ("a", "c")] {
        graph.data.links.push(link(s, t, 0.9, "d1"));
    }
    for (s, t) in [("x", "y"), ("y", "z"), ("x", "z")] {
        graph.data.links.push(link(s, t, 0.9, "d1"));
    }
    graph
}

/// A raw observation table: rows 0 and 1 perfectly correlated, row 2
/// anti-correlated with both.
pub fn observation_text() -> &'static str {
    "gene,s1,s2,s3,s4\nA,1,2,3,4\nB,2,4,6,8\nC,4,3,2,1\n"
}
