//! Tests for the graph model, builders and merge operations.

use super::merge::{join, merge_by_name};
use super::*;
use crate::table::parse_delimited;
use test_log::test;

fn link(a: &str, b: &str, weights: &[f64], attribs: &[&str]) -> Link {
    Link::new(
        a,
        b,
        weights.to_vec(),
        attribs.iter().map(|s| s.to_string()).collect(),
    )
}

#[test]
fn from_matrix_builds_pairwise_links() {
    let table = parse_delimited("id,X,Y\nX,1,0.9\nY,0.9,1\n").unwrap();
    let graph = Graph::from_matrix(&table, "m").unwrap();
    assert_eq!(graph.node_ids(), vec!["X", "Y"]);
    assert_eq!(graph.data.links.len(), 1);
    let link = &graph.data.links[0];
    assert_eq!(link.source, "X");
    assert_eq!(link.target, "Y");
    assert_eq!(link.weights, vec![0.9]);
    assert_eq!(link.attribs, vec!["m"]);
}

#[test]
fn from_matrix_rounds_values() {
    let table = parse_delimited("id,X,Y\nX,1,0.894999\nY,0.894999,1\n").unwrap();
    let graph = Graph::from_matrix(&table, "m").unwrap();
    assert_eq!(graph.data.links[0].weights, vec![0.89]);
}

#[test]
fn from_matrix_rejects_non_square() {
    let table = parse_delimited("id,X,Y\nX,1,0.9\n").unwrap();
    assert!(Graph::from_matrix(&table, "m").is_err());
}

#[test]
fn from_edges_builds_nodes_for_all_rows() {
    let edges = crate::correlate::EdgeList {
        sources: vec![1],
        targets: vec![0],
        weights: vec![0.95],
    };
    let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let graph = Graph::from_edges(&names, &edges, "run1");
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.link_count(), 1);
    assert_eq!(graph.data.links[0].source, "B");
    assert_eq!(graph.data.links[0].target, "A");
}

#[test]
fn json_round_trip() {
    let mut graph = Graph::new("roundtrip");
    graph.data.nodes.push(Node {
        id: "a".to_string(),
        groups: vec!["pathway x".to_string()],
    });
    graph.data.nodes.push(Node::new("b"));
    graph.data.links.push(link("a", "b", &[0.9, -0.4], &["d1", "d2"]));
    let mut physics = serde_json::Map::new();
    physics.insert("charge".to_string(), serde_json::json!(-100.0));
    graph.data.physics = Some(physics);

    let value = graph.to_json().unwrap();
    let imported = Graph::from_json("roundtrip", &value).unwrap();
    assert_eq!(imported, graph);
}

#[test]
fn from_json_rejects_malformed_payloads() {
    let missing_links = serde_json::json!({"nodes": []});
    assert!(Graph::from_json("bad", &missing_links).is_err());

    let dangling = serde_json::json!({
        "nodes": [{"id": "a", "groups": []}],
        "links": [{"source": "a", "target": "ghost", "weights": [1.0], "attribs": ["m"]}]
    });
    assert!(Graph::from_json("bad", &dangling).is_err());
}

#[test]
fn from_json_drops_absent_links() {
    let payload = serde_json::json!({
        "nodes": [{"id": "a", "groups": []}, {"id": "b", "groups": []}],
        "links": [{"source": "a", "target": "b", "weights": [], "attribs": []}]
    });
    let graph = Graph::from_json("sparse", &payload).unwrap();
    assert_eq!(graph.link_count(), 0);
}

#[test]
fn undirected_keys_are_canonical() {
    assert_eq!(undirected_key("b", "a"), undirected_key("a", "b"));
    let forward = link("a", "b", &[1.0], &["m"]);
    let backward = link("b", "a", &[1.0], &["m"]);
    assert_eq!(forward.key(), backward.key());
}

#[test]
fn degrees_count_incident_links_once() {
    let mut graph = Graph::new("deg");
    for id in ["a", "b", "c"] {
        graph.data.nodes.push(Node::new(id));
    }
    graph.data.links.push(link("a", "b", &[0.5, 0.7], &["d1", "d2"]));
    graph.data.links.push(link("a", "c", &[0.5], &["d1"]));
    let degrees = graph.degrees();
    assert_eq!(degrees["a"], 2);
    assert_eq!(degrees["b"], 1);
    assert_eq!(degrees["c"], 1);
}

#[test]
fn drop_dangling_removes_orphans_and_empties() {
    let mut graph = Graph::new("dangle");
    graph.data.nodes.push(Node::new("a"));
    graph.data.nodes.push(Node::new("b"));
    graph.data.links.push(link("a", "b", &[0.9], &["m"]));
    graph.data.links.push(link("a", "gone", &[0.9], &["m"]));
    graph.data.links.push(link("a", "b", &[], &[]));
    graph.drop_dangling_links();
    assert_eq!(graph.link_count(), 1);
}

#[test]
fn signature_tracks_content() {
    let mut graph = Graph::new("sig");
    graph.data.nodes.push(Node::new("a"));
    let original = graph.signature();
    assert_eq!(original, graph.signature());

    graph.data.nodes.push(Node::new("b"));
    assert_ne!(original, graph.signature());
}

#[test]
fn max_weight_defaults_to_one() {
    assert_eq!(link("a", "b", &[0.3, 0.9], &["x", "y"]).max_weight(), 0.9);
    assert_eq!(link("a", "b", &[], &[]).max_weight(), 1.0);
}

#[test]
fn join_unions_nodes_and_groups() {
    let mut base = Graph::new("base");
    base.data.nodes.push(Node {
        id: "a".to_string(),
        groups: vec!["g1".to_string()],
    });
    let mut incoming = Graph::new("incoming");
    incoming.data.nodes.push(Node {
        id: "a".to_string(),
        groups: vec!["g1".to_string(), "g2".to_string()],
    });
    incoming.data.nodes.push(Node::new("b"));

    let joined = join(&base, &incoming);
    assert_eq!(joined.node_ids(), vec!["a", "b"]);
    assert_eq!(joined.data.nodes[0].groups, vec!["g1", "g2"]);
}

#[test]
fn join_appends_only_new_attribs() {
    let mut base = Graph::new("base");
    base.data.nodes.push(Node::new("a"));
    base.data.nodes.push(Node::new("b"));
    base.data.links.push(link("a", "b", &[0.9], &["d1"]));

    let mut incoming = Graph::new("incoming");
    incoming.data.nodes.push(Node::new("a"));
    incoming.data.nodes.push(Node::new("b"));
    // Same pair, reversed orientation; d1 must not be overwritten.
    incoming
        .data
        .links
        .push(link("b", "a", &[0.2, 0.7], &["d1", "d2"]));

    let joined = join(&base, &incoming);
    assert_eq!(joined.link_count(), 1);
    let merged = &joined.data.links[0];
    assert_eq!(merged.attribs, vec!["d1", "d2"]);
    assert_eq!(merged.weights, vec![0.9, 0.7]);
}

#[test]
fn join_inserts_unmatched_links() {
    let mut base = Graph::new("base");
    base.data.nodes.push(Node::new("a"));
    base.data.nodes.push(Node::new("b"));

    let mut incoming = Graph::new("incoming");
    incoming.data.nodes.push(Node::new("a"));
    incoming.data.nodes.push(Node::new("b"));
    incoming.data.links.push(link("a", "b", &[0.5], &["d9"]));

    let joined = join(&base, &incoming);
    assert_eq!(joined.link_count(), 1);
    assert_eq!(joined.data.links[0].attribs, vec!["d9"]);
}

#[test]
fn merge_by_name_disabled_is_identity() {
    let mut graph = Graph::new("plain");
    graph.data.nodes.push(Node::new("P1_Insulin"));
    assert_eq!(merge_by_name(&graph, false), graph);
}

#[test]
fn merge_by_name_collapses_shared_names() {
    let mut graph = Graph::new("compound");
    graph.data.nodes.push(Node {
        id: "P1_Insulin_S2".to_string(),
        groups: vec!["secretion".to_string()],
    });
    graph.data.nodes.push(Node {
        id: "P2_insulin".to_string(),
        groups: vec!["signaling".to_string()],
    });
    graph.data.nodes.push(Node::new("P3_Glucagon"));
    graph
        .data
        .links
        .push(link("P1_Insulin_S2", "P2_insulin", &[0.9], &["d1"]));
    graph
        .data
        .links
        .push(link("P1_Insulin_S2", "P3_Glucagon", &[0.4], &["d1"]));
    graph
        .data
        .links
        .push(link("P2_insulin", "P3_Glucagon", &[-0.8], &["d1"]));

    let merged = merge_by_name(&graph, true);
    // The two insulin nodes collapse; their interconnecting link is a
    // self-loop and disappears.
    assert_eq!(merged.node_count(), 2);
    let insulin = &merged.data.nodes[0];
    assert_eq!(insulin.id, "P1_Insulin_S2");
    assert_eq!(insulin.groups, vec!["secretion", "signaling"]);
    // Parallel links to glucagon combine, keeping max(|w1|, |w2|).
    assert_eq!(merged.link_count(), 1);
    assert_eq!(merged.data.links[0].weights, vec![0.8]);
}

#[test]
fn merge_by_name_multi_entry_ids() {
    let mut graph = Graph::new("multi");
    graph.data.nodes.push(Node::new("P1_Kinase;P2_Lipase"));
    graph.data.nodes.push(Node::new("P3_lipase"));
    graph.data.nodes.push(Node::new("P4_Other"));

    let merged = merge_by_name(&graph, true);
    assert_eq!(merged.node_count(), 2);
    assert_eq!(merged.data.nodes[0].id, "P1_Kinase;P2_Lipase");
    assert_eq!(merged.data.nodes[1].id, "P4_Other");
}
