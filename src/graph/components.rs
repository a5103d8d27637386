//! Connected components over a graph's current link set.
//!
//! Shared by the component-size and density filters and by resolution-0
//! community detection. Component indices are assigned in first-seen node
//! order, so identical graphs always yield identical labelings.

use std::collections::{BTreeMap, HashMap};

use petgraph::unionfind::UnionFind;

use crate::graph::Graph;

#[derive(Debug, Clone, Default)]
pub struct Components {
    /// Node id → component index, 0-based, dense.
    pub membership: BTreeMap<String, usize>,
    /// Node count per component.
    pub sizes: Vec<usize>,
    /// Links with both endpoints inside the component.
    pub internal_links: Vec<usize>,
}

impl Components {
    pub fn compute(graph: &Graph) -> Components {
        let index_of: HashMap<&str, usize> = graph
            .data
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.as_str(), idx))
            .collect();

        let mut union_find: UnionFind<usize> = UnionFind::new(graph.data.nodes.len());
        for link in &graph.data.links {
            if let (Some(&source), Some(&target)) = (
                index_of.get(link.source.as_str()),
                index_of.get(link.target.as_str()),
            ) {
                union_find.union(source, target);
            }
        }

        // Renumber union-find roots densely, in node order.
        let mut root_to_component: HashMap<usize, usize> = HashMap::new();
        let mut membership = BTreeMap::new();
        let mut sizes = Vec::new();
        for (idx, node) in graph.data.nodes.iter().enumerate() {
            let root = union_find.find(idx);
            let next = sizes.len();
            let component = *root_to_component.entry(root).or_insert(next);
            if component == sizes.len() {
                sizes.push(0);
            }
            sizes[component] += 1;
            membership.insert(node.id.clone(), component);
        }

        let mut internal_links = vec![0usize; sizes.len()];
        for link in &graph.data.links {
            if let (Some(&a), Some(&b)) = (
                membership.get(&link.source),
                membership.get(&link.target),
            ) {
                if a == b {
                    internal_links[a] += 1;
                }
            }
        }

        Components {
            membership,
            sizes,
            internal_links,
        }
    }

    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Size of the component containing `id`.
    pub fn size_of(&self, id: &str) -> Option<usize> {
        self.membership.get(id).map(|&c| self.sizes[c])
    }

    /// Average degree of a component: `2 * internal links / size`.
    pub fn density(&self, component: usize) -> f64 {
        match self.sizes.get(component) {
            Some(&size) if size > 0 => 2.0 * self.internal_links[component] as f64 / size as f64,
            _ => 0.0,
        }
    }

    /// Density of the component containing `id`.
    pub fn density_of(&self, id: &str) -> Option<f64> {
        self.membership.get(id).map(|&c| self.density(c))
    }
}
