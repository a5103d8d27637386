//! Combining graphs: union of uploaded graphs and name-based node merging.
//!
//! `join` unions two graphs while never rewriting weight/attrib entries the
//! base graph already carries; the first upload wins for a shared attrib.
//! `merge_by_name` collapses nodes that represent the same named entity
//! across compound ids (see [`split_entries`]), eliminating the self-loops
//! that collapse produces.

use std::collections::{BTreeMap, HashMap};

use petgraph::unionfind::UnionFind;

use crate::graph::{undirected_key, Graph, Link, Node};

/// Union of `base` and `incoming`.
///
/// Nodes are matched by id (groups unioned, base order first); links are
/// matched by undirected endpoint pair. For a matched link, only attribs
/// the base link does not already carry are appended, with their weights.
pub fn join(base: &Graph, incoming: &Graph) -> Graph {
    let mut joined = base.clone();

    let mut node_of: HashMap<String, usize> = joined
        .data
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.clone(), idx))
        .collect();
    for node in &incoming.data.nodes {
        match node_of.get(&node.id) {
            Some(&idx) => {
                let groups = &mut joined.data.nodes[idx].groups;
                for group in &node.groups {
                    if !groups.contains(group) {
                        groups.push(group.clone());
                    }
                }
            }
            None => {
                node_of.insert(node.id.clone(), joined.data.nodes.len());
                joined.data.nodes.push(node.clone());
            }
        }
    }

    let mut link_of: HashMap<(String, String), usize> = joined.link_index();
    for link in &incoming.data.links {
        match link_of.get(&link.key()) {
            Some(&idx) => {
                let existing = &mut joined.data.links[idx];
                for (attrib, weight) in link.attribs.iter().zip(link.weights.iter()) {
                    if !existing.attribs.contains(attrib) {
                        existing.attribs.push(attrib.clone());
                        existing.weights.push(*weight);
                    }
                }
            }
            None => {
                link_of.insert(link.key(), joined.data.links.len());
                joined.data.links.push(link.clone());
            }
        }
    }

    tracing::debug!(
        nodes = joined.node_count(),
        links = joined.link_count(),
        incoming = %incoming.name,
        "joined graphs"
    );
    joined
}

/// Split a compound node id into its `;`-separated entries.
pub fn split_entries(id: &str) -> impl Iterator<Item = &str> {
    id.split(';').map(str::trim).filter(|e| !e.is_empty())
}

/// The `Name` fragment of an `EntityId_Name[_SiteList]` entry, normalized
/// for matching. Entries without an underscore use the whole entry.
fn entry_name(entry: &str) -> String {
    entry
        .split('_')
        .nth(1)
        .unwrap_or(entry)
        .to_ascii_lowercase()
}

/// Collapse nodes sharing a normalized entry name into merged nodes.
///
/// The merged node id concatenates constituent entries deduplicated by
/// name; groups are unioned. Links between constituents of the same merged
/// node are dropped; links surviving between different merged nodes are
/// combined per attrib, taking `max(|w1|, |w2|)` when both sides carry the
/// attrib. Disabled, this is the identity.
pub fn merge_by_name(graph: &Graph, enabled: bool) -> Graph {
    if !enabled || graph.data.nodes.is_empty() {
        return graph.clone();
    }

    let n = graph.data.nodes.len();
    let mut union_find: UnionFind<usize> = UnionFind::new(n);
    let mut first_with_name: HashMap<String, usize> = HashMap::new();
    for (idx, node) in graph.data.nodes.iter().enumerate() {
        for entry in split_entries(&node.id) {
            match first_with_name.entry(entry_name(entry)) {
                std::collections::hash_map::Entry::Occupied(seen) => {
                    union_find.union(idx, *seen.get());
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
            }
        }
    }

    // Gather constituents per merged group, preserving node order.
    let mut groups_of: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for idx in 0..n {
        groups_of.entry(union_find.find(idx)).or_default().push(idx);
    }

    let mut merged = Graph::new(graph.name.clone());
    let mut merged_id_of: HashMap<usize, String> = HashMap::new();
    let mut order: Vec<usize> = groups_of.keys().copied().collect();
    order.sort_by_key(|root| groups_of[root][0]);
    for root in order {
        let constituents = &groups_of[&root];
        let mut entries: Vec<&str> = Vec::new();
        let mut seen_names: Vec<String> = Vec::new();
        let mut groups: Vec<String> = Vec::new();
        for &idx in constituents {
            let node = &graph.data.nodes[idx];
            for entry in split_entries(&node.id) {
                let name = entry_name(entry);
                if !seen_names.contains(&name) {
                    seen_names.push(name);
                    entries.push(entry);
                }
            }
            for group in &node.groups {
                if !groups.contains(group) {
                    groups.push(group.clone());
                }
            }
        }
        let id = entries.join(";");
        for &idx in constituents {
            merged_id_of.insert(idx, id.clone());
        }
        merged.data.nodes.push(Node {
            id,
            groups,
        });
    }

    let index_of: HashMap<&str, usize> = graph
        .data
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut link_of: HashMap<(String, String), usize> = HashMap::new();
    let mut dropped_loops = 0usize;
    for link in &graph.data.links {
        let (Some(&source_idx), Some(&target_idx)) = (
            index_of.get(link.source.as_str()),
            index_of.get(link.target.as_str()),
        ) else {
            continue;
        };
        let source = &merged_id_of[&source_idx];
        let target = &merged_id_of[&target_idx];
        if source == target {
            dropped_loops += 1;
            continue;
        }
        let key = undirected_key(source, target);
        match link_of.get(&key) {
            Some(&idx) => {
                let existing = &mut merged.data.links[idx];
                for (attrib, weight) in link.attribs.iter().zip(link.weights.iter()) {
                    match existing.attribs.iter().position(|a| a == attrib) {
                        Some(pos) => {
                            existing.weights[pos] =
                                existing.weights[pos].abs().max(weight.abs());
                        }
                        None => {
                            existing.attribs.push(attrib.clone());
                            existing.weights.push(*weight);
                        }
                    }
                }
            }
            None => {
                link_of.insert(key, merged.data.links.len());
                merged.data.links.push(Link::new(
                    source.clone(),
                    target.clone(),
                    link.weights.clone(),
                    link.attribs.clone(),
                ));
            }
        }
    }

    merged.data.physics = graph.data.physics.clone();
    tracing::debug!(
        before = graph.node_count(),
        after = merged.node_count(),
        dropped_loops,
        "merged nodes by name"
    );
    merged
}
