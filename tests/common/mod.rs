//! Shared fixtures for integration tests.

use corrnet_core::graph::{Graph, Link, Node};

/// Observation upload with an obvious correlation structure: A and B move
/// together, C moves against both, D is flat (zero variance).
pub fn raw_upload() -> &'static str {
    "gene,s1,s2,s3,s4\n\
     A,1,2,3,4\n\
     B,2,4,6,8\n\
     C,4,3,2,1\n\
     D,5,5,5,5\n"
}

/// Symmetric matrix upload for the same entities.
pub fn matrix_upload() -> &'static str {
    "id,A,B,C\n\
     A,1.0,0.95,-0.88\n\
     B,0.95,1.0,-0.91\n\
     C,-0.88,-0.91,1.0\n"
}

pub fn grouped_node(id: &str, groups: &[&str]) -> Node {
    Node {
        id: id.to_string(),
        groups: groups.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn weighted_link(a: &str, b: &str, weight: f64, attrib: &str) -> Link {
    Link::new(a, b, vec![weight], vec![attrib.to_string()])
}

/// Two communities of three nodes joined by one weak bridge.
pub fn bridged_clusters() -> Graph {
    let mut graph = Graph::new("clusters");
    for id in ["a", "b", "c"] {
        graph.data.nodes.push(grouped_node(id, &["lean group"]));
    }
    for id in ["x", "y", "z"] {
        graph.data.nodes.push(grouped_node(id, &["obese group"]));
    }
    for (s, t) in [("a", "b"), ("b", "c"), ("a", "c")] {
        graph.data.links.push(weighted_link(s, t, 0.9, "d1"));
    }
    for (s, t) in [("x", "y"), ("y", "z"), ("x", "z")] {
        graph.data.links.push(weighted_link(s, t, 0.9, "d1"));
    }
    graph.data.links.push(weighted_link("c", "x", 0.15, "d1"));
    graph
}
