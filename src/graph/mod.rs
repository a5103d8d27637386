//! Canonical graph model for correlation networks.
//!
//! A [`Graph`] is the unit that flows through the whole pipeline: builders
//! produce it from matrices or edge lists, the merge and filter passes map
//! it to new snapshots, and community detection summarizes it. Links are
//! undirected parallel-array multi-edges: `weights[i]` belongs to
//! `attribs[i]`, one entry per named dataset, and a link whose arrays are
//! empty is considered absent.
//!
//! `source`/`target` are always plain node ids. Rendering layers that want
//! endpoint objects must look nodes up by id; they never write object
//! references back into this model.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::{
    correlate::{round2, EdgeList},
    error::CorrNetError,
    table::Table,
    verify,
};

pub mod components;
pub mod merge;
#[cfg(test)]
mod tests;

/// A graph node: unique id plus insertion-ordered attribute groups.
/// `groups[0]`, when present, is the node's primary group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Node {
        Node {
            id: id.into(),
            groups: Vec::new(),
        }
    }
}

/// An undirected multi-edge. `weights` and `attribs` are parallel arrays;
/// entry `i` is one named sub-edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub weights: Vec<f64>,
    pub attribs: Vec<String>,
}

impl Link {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        weights: Vec<f64>,
        attribs: Vec<String>,
    ) -> Link {
        Link {
            source: source.into(),
            target: target.into(),
            weights,
            attribs,
        }
    }

    /// Canonical undirected key: the endpoint pair, lexicographically
    /// sorted. `(a, b)` and `(b, a)` map to the same key.
    pub fn key(&self) -> (String, String) {
        undirected_key(&self.source, &self.target)
    }

    /// A link with no remaining sub-edges is absent and must be dropped.
    pub fn is_void(&self) -> bool {
        self.weights.is_empty()
    }

    /// Largest weight across sub-edges, 1.0 when absent. This is the
    /// scalar weight community detection uses.
    pub fn max_weight(&self) -> f64 {
        self.weights.iter().copied().reduce(f64::max).unwrap_or(1.0)
    }
}

/// Canonical undirected endpoint pair.
pub fn undirected_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// The node/link payload of a graph, and the canonical JSON import/export
/// unit. `physics` is renderer-owned settings carried opaquely; it is
/// type-checked during verification but never interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<Map<String, Value>>,
}

/// A named graph snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub data: GraphData,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Graph {
        Graph {
            name: name.into(),
            data: GraphData::default(),
        }
    }

    /// Build a graph from a symmetric correlation matrix: one node per
    /// label with empty groups, one link per unordered pair `i < j`
    /// carrying the two-decimal-rounded matrix value under `link_attrib`.
    pub fn from_matrix(table: &Table, link_attrib: &str) -> Result<Graph, CorrNetError> {
        let n = table.header.len();
        if table.data.len() != n {
            return Err(CorrNetError::Parse(format!(
                "matrix is not square: {} columns, {} rows",
                n,
                table.data.len()
            )));
        }
        let mut graph = Graph::new(link_attrib);
        graph.data.nodes = table.header.iter().map(Node::new).collect();
        for i in 0..n {
            for j in (i + 1)..n {
                let Some(value) = table.data[i].get(j).and_then(|c| c.as_number()) else {
                    return Err(CorrNetError::Parse(format!(
                        "matrix cell ({i}, {j}) is not numeric"
                    )));
                };
                graph.data.links.push(Link::new(
                    table.header[i].clone(),
                    table.header[j].clone(),
                    vec![round2(value)],
                    vec![link_attrib.to_string()],
                ));
            }
        }
        Ok(graph)
    }

    /// Build a graph from correlation engine output: one node per row
    /// label, one link per emitted edge.
    pub fn from_edges(row_names: &[String], edges: &EdgeList, link_attrib: &str) -> Graph {
        let mut graph = Graph::new(link_attrib);
        graph.data.nodes = row_names.iter().map(Node::new).collect();
        graph.data.links = edges
            .iter()
            .map(|(source, target, weight)| {
                Link::new(
                    row_names[source as usize].clone(),
                    row_names[target as usize].clone(),
                    vec![weight],
                    vec![link_attrib.to_string()],
                )
            })
            .collect();
        graph
    }

    /// Import a graph from its canonical JSON form, verifying structure
    /// first. Malformed shapes surface as [`CorrNetError::Structural`]
    /// without committing a partial graph.
    pub fn from_json(name: &str, value: &Value) -> Result<Graph, CorrNetError> {
        verify::verify_value(value)?;
        let data: GraphData = serde_json::from_value(value.clone())?;
        let mut graph = Graph {
            name: name.to_string(),
            data,
        };
        verify::verify(&graph)?;
        // Zero-length parallel arrays mean the link is absent.
        graph.drop_dangling_links();
        Ok(graph)
    }

    /// Export to the canonical JSON form (`{nodes, links, physics?}`).
    pub fn to_json(&self) -> Result<Value, CorrNetError> {
        Ok(serde_json::to_value(&self.data)?)
    }

    pub fn node_count(&self) -> usize {
        self.data.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.data.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nodes.is_empty() && self.data.links.is_empty()
    }

    /// Ids of all nodes, in graph order.
    pub fn node_ids(&self) -> Vec<&str> {
        self.data.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Lookup index from canonical link key to position in `links`.
    pub fn link_index(&self) -> HashMap<(String, String), usize> {
        self.data
            .links
            .iter()
            .enumerate()
            .map(|(idx, link)| (link.key(), idx))
            .collect()
    }

    /// Incident link count per node id. Multi-edges count once; this is
    /// the degree the k-core filter peels on.
    pub fn degrees(&self) -> BTreeMap<String, usize> {
        let mut degrees: BTreeMap<String, usize> =
            self.data.nodes.iter().map(|n| (n.id.clone(), 0)).collect();
        for link in &self.data.links {
            if let Some(d) = degrees.get_mut(&link.source) {
                *d += 1;
            }
            if let Some(d) = degrees.get_mut(&link.target) {
                *d += 1;
            }
        }
        degrees
    }

    /// Remove links that reference missing nodes or that carry no
    /// sub-edges. Must run after every node-removing pass so that links
    /// always reference existing nodes before the next link-inspecting
    /// stage.
    pub fn drop_dangling_links(&mut self) {
        let ids: BTreeSet<&str> = self.data.nodes.iter().map(|n| n.id.as_str()).collect();
        let before = self.data.links.len();
        self.data.links.retain(|link| {
            !link.is_void() && ids.contains(link.source.as_str()) && ids.contains(link.target.as_str())
        });
        let dropped = before - self.data.links.len();
        if dropped > 0 {
            tracing::debug!(dropped, "removed dangling or empty links");
        }
    }

    /// Keep only nodes satisfying `keep`, then drop dangling links.
    pub fn retain_nodes<F: FnMut(&Node) -> bool>(&mut self, keep: F) {
        self.data.nodes.retain(keep);
        self.drop_dangling_links();
    }

    /// Content hash of this snapshot. Two graphs with identical nodes,
    /// links and physics settings share a signature; community summaries
    /// use it to detect staleness.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        for node in &self.data.nodes {
            hasher.update([0u8]);
            hasher.update(node.id.as_bytes());
            for group in &node.groups {
                hasher.update([1u8]);
                hasher.update(group.as_bytes());
            }
        }
        for link in &self.data.links {
            let (a, b) = link.key();
            hasher.update([2u8]);
            hasher.update(a.as_bytes());
            hasher.update([3u8]);
            hasher.update(b.as_bytes());
            for (weight, attrib) in link.weights.iter().zip(link.attribs.iter()) {
                hasher.update(weight.to_bits().to_be_bytes());
                hasher.update(attrib.as_bytes());
            }
        }
        if let Some(physics) = &self.data.physics {
            hasher.update([4u8]);
            hasher.update(Value::Object(physics.clone()).to_string().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
