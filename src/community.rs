//! Community detection and per-community summaries.
//!
//! At resolution 0 communities are plain connected components; above 0 they
//! come from Louvain modularity optimization, using each link's largest
//! weight (1.0 when absent) as the edge weight. Node visiting order is
//! fixed (ascending index) and neighbor maps are ordered, so identical
//! graphs always produce identical communities; there is no random
//! element to seed.
//!
//! Summaries are derived state: they carry the signature of the graph they
//! were computed from plus the resolution used, and
//! [`CommunitySummary::is_stale`] tells the caller when a recomputation is
//! due. Recomputation is explicit, so rapid UI parameter changes do not
//! trigger redundant Louvain runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{components::Components, Graph};

/// How many top attribute values a community summary reports.
pub const DEFAULT_TOP_ATTRIBUTES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummarizeOptions {
    /// 0 ⇒ connected components; > 0 ⇒ Louvain with this resolution.
    pub resolution: f64,
    /// Number of ranked attribute values per community.
    pub top_attributes: usize,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        SummarizeOptions {
            resolution: 0.0,
            top_attributes: DEFAULT_TOP_ATTRIBUTES,
        }
    }
}

/// One detected community and its structural statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Stable group id from detection (dense index, as a string).
    pub id: String,
    /// Display label, `Community {rank}` with 1-based rank after sorting.
    pub label: String,
    pub size: usize,
    /// Links with both endpoints inside the community.
    pub link_count: usize,
    /// Links with exactly one endpoint inside, counted from each side.
    pub external_link_count: usize,
    /// Average degree: `2 · link_count / size`, 0 for empty groups.
    pub density: f64,
    /// Most frequent node groups, `(value, count)`, count desc, name asc.
    pub top_attributes: Vec<(String, usize)>,
    /// Most frequent attribs of internal links, same ordering.
    pub top_link_attributes: Vec<(String, usize)>,
}

/// Result of [`summarize`]: community list plus node↔community lookup
/// tables, tagged with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub communities: Vec<Community>,
    pub id_to_community: BTreeMap<String, String>,
    pub community_to_node_ids: BTreeMap<String, Vec<String>>,
    pub graph_signature: String,
    pub resolution: f64,
}

impl CommunitySummary {
    /// Whether this summary still describes `graph` at `resolution`.
    pub fn is_stale(&self, graph: &Graph, resolution: f64) -> bool {
        self.resolution != resolution || self.graph_signature != graph.signature()
    }
}

/// Group the graph's nodes and summarize each group.
#[tracing::instrument(skip(graph, options), fields(nodes = graph.node_count(), resolution = options.resolution))]
pub fn summarize(graph: &Graph, options: &SummarizeOptions) -> CommunitySummary {
    let membership: BTreeMap<String, usize> = if options.resolution == 0.0 {
        Components::compute(graph).membership
    } else {
        louvain_membership(graph, options.resolution)
    };

    let group_count = membership.values().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; group_count];
    let mut members: Vec<Vec<String>> = vec![Vec::new(); group_count];
    // Preserve graph node order inside each group.
    for node in &graph.data.nodes {
        if let Some(&group) = membership.get(&node.id) {
            sizes[group] += 1;
            members[group].push(node.id.clone());
        }
    }

    let mut link_counts = vec![0usize; group_count];
    let mut external_counts = vec![0usize; group_count];
    let mut link_attrib_counts: Vec<BTreeMap<&str, usize>> = vec![BTreeMap::new(); group_count];
    for link in &graph.data.links {
        let (Some(&a), Some(&b)) = (membership.get(&link.source), membership.get(&link.target))
        else {
            continue;
        };
        if a == b {
            link_counts[a] += 1;
            for attrib in &link.attribs {
                *link_attrib_counts[a].entry(attrib.as_str()).or_default() += 1;
            }
        } else {
            external_counts[a] += 1;
            external_counts[b] += 1;
        }
    }

    let mut group_attrib_counts: Vec<BTreeMap<&str, usize>> = vec![BTreeMap::new(); group_count];
    for node in &graph.data.nodes {
        if let Some(&group) = membership.get(&node.id) {
            for value in &node.groups {
                *group_attrib_counts[group].entry(value.as_str()).or_default() += 1;
            }
        }
    }

    let mut communities: Vec<Community> = (0..group_count)
        .map(|group| Community {
            id: group.to_string(),
            label: String::new(),
            size: sizes[group],
            link_count: link_counts[group],
            external_link_count: external_counts[group],
            density: if sizes[group] > 0 {
                2.0 * link_counts[group] as f64 / sizes[group] as f64
            } else {
                0.0
            },
            top_attributes: top_n(&group_attrib_counts[group], options.top_attributes),
            top_link_attributes: top_n(&link_attrib_counts[group], options.top_attributes),
        })
        .collect();

    // Size descending, then id ascending; labels are 1-based post-sort.
    communities.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| numeric_id(&a.id).cmp(&numeric_id(&b.id)))
    });
    for (rank, community) in communities.iter_mut().enumerate() {
        community.label = format!("Community {}", rank + 1);
    }

    let id_to_community: BTreeMap<String, String> = membership
        .iter()
        .map(|(node, &group)| (node.clone(), group.to_string()))
        .collect();
    let community_to_node_ids: BTreeMap<String, Vec<String>> = members
        .into_iter()
        .enumerate()
        .map(|(group, ids)| (group.to_string(), ids))
        .collect();

    tracing::debug!(groups = communities.len(), "summarized communities");
    CommunitySummary {
        communities,
        id_to_community,
        community_to_node_ids,
        graph_signature: graph.signature(),
        resolution: options.resolution,
    }
}

fn numeric_id(id: &str) -> usize {
    id.parse().unwrap_or(usize::MAX)
}

/// Top `n` entries by count descending, name ascending on ties.
fn top_n(counts: &BTreeMap<&str, usize>, n: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .iter()
        .map(|(name, &count)| (name.to_string(), count))
        .collect();
    // BTreeMap iteration is already name-ascending, so a stable sort by
    // count descending keeps the tie-break.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

/// Modularity improvement below which a Louvain level stops.
const MIN_IMPROVEMENT: f64 = 1e-7;
/// Hard cap on aggregation levels.
const MAX_LEVELS: usize = 10;

/// Louvain membership per node id, dense group indices in first-seen node
/// order.
fn louvain_membership(graph: &Graph, resolution: f64) -> BTreeMap<String, usize> {
    let n = graph.data.nodes.len();
    // Ordered adjacency: deterministic neighbor iteration. Self-loop
    // weights (from aggregation) are tracked separately.
    let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    let index_of: BTreeMap<&str, usize> = graph
        .data
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    for link in &graph.data.links {
        let (Some(&a), Some(&b)) = (
            index_of.get(link.source.as_str()),
            index_of.get(link.target.as_str()),
        ) else {
            continue;
        };
        if a == b {
            continue;
        }
        let weight = link.max_weight();
        *adjacency[a].entry(b).or_default() += weight;
        *adjacency[b].entry(a).or_default() += weight;
    }

    let mut level = LouvainLevel::new(adjacency, vec![0.0; n]);
    // node -> community through all completed levels
    let mut assignment: Vec<usize> = (0..n).collect();
    for _ in 0..MAX_LEVELS {
        let moved = level.local_moving(resolution);
        let partition = level.dense_partition();
        for slot in assignment.iter_mut() {
            *slot = partition[*slot];
        }
        if !moved || partition.iter().collect::<std::collections::BTreeSet<_>>().len()
            == partition.len()
        {
            break;
        }
        level = level.aggregate(&partition);
    }

    // Renumber communities densely in first-seen node order.
    let mut renumber: BTreeMap<usize, usize> = BTreeMap::new();
    let mut membership = BTreeMap::new();
    for (idx, node) in graph.data.nodes.iter().enumerate() {
        let next = renumber.len();
        let group = *renumber.entry(assignment[idx]).or_insert(next);
        membership.insert(node.id.clone(), group);
    }
    membership
}

/// One level of the Louvain hierarchy: a weighted graph whose nodes are
/// the previous level's communities.
struct LouvainLevel {
    adjacency: Vec<BTreeMap<usize, f64>>,
    self_loops: Vec<f64>,
    /// Weighted degree per node, self-loops counted twice.
    degrees: Vec<f64>,
    /// Total edge weight `m` (each undirected edge once).
    total_weight: f64,
    community: Vec<usize>,
    /// Sum of member degrees per community.
    sum_tot: Vec<f64>,
}

impl LouvainLevel {
    fn new(adjacency: Vec<BTreeMap<usize, f64>>, self_loops: Vec<f64>) -> LouvainLevel {
        let n = adjacency.len();
        let degrees: Vec<f64> = (0..n)
            .map(|i| adjacency[i].values().sum::<f64>() + 2.0 * self_loops[i])
            .collect();
        let total_weight = degrees.iter().sum::<f64>() / 2.0;
        LouvainLevel {
            adjacency,
            self_loops,
            degrees,
            total_weight,
            community: (0..n).collect(),
            sum_tot: vec![0.0; n],
        }
    }

    /// Move nodes between communities until no move improves modularity.
    /// Returns whether any node moved at all.
    fn local_moving(&mut self, resolution: f64) -> bool {
        let n = self.adjacency.len();
        self.sum_tot = vec![0.0; n];
        for node in 0..n {
            self.sum_tot[self.community[node]] += self.degrees[node];
        }
        if self.total_weight <= 0.0 {
            return false;
        }
        let two_m = 2.0 * self.total_weight;
        let mut any_moved = false;
        loop {
            let mut improved = false;
            for node in 0..n {
                let current = self.community[node];
                // Weight from `node` to each neighboring community.
                let mut links_to: BTreeMap<usize, f64> = BTreeMap::new();
                for (&neighbor, &weight) in &self.adjacency[node] {
                    *links_to.entry(self.community[neighbor]).or_default() += weight;
                }
                // Detach, then find the best community including the old.
                self.sum_tot[current] -= self.degrees[node];
                let gain_of = |community: usize, link_weight: f64| {
                    link_weight
                        - resolution * self.degrees[node] * self.sum_tot[community] / two_m
                };
                let mut best = current;
                let mut best_gain =
                    gain_of(current, links_to.get(&current).copied().unwrap_or(0.0));
                for (&candidate, &link_weight) in &links_to {
                    if candidate == current {
                        continue;
                    }
                    let gain = gain_of(candidate, link_weight);
                    if gain > best_gain + MIN_IMPROVEMENT {
                        best = candidate;
                        best_gain = gain;
                    }
                }
                self.sum_tot[best] += self.degrees[node];
                if best != current {
                    self.community[node] = best;
                    improved = true;
                    any_moved = true;
                }
            }
            if !improved {
                return any_moved;
            }
        }
    }

    /// Current communities renumbered densely in node order.
    fn dense_partition(&self) -> Vec<usize> {
        let mut renumber: BTreeMap<usize, usize> = BTreeMap::new();
        self.community
            .iter()
            .map(|&c| {
                let next = renumber.len();
                *renumber.entry(c).or_insert(next)
            })
            .collect()
    }

    /// Collapse communities into super-nodes for the next level.
    fn aggregate(&self, partition: &[usize]) -> LouvainLevel {
        let groups = partition.iter().copied().max().map_or(0, |m| m + 1);
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); groups];
        let mut self_loops = vec![0.0; groups];
        for node in 0..self.adjacency.len() {
            let a = partition[node];
            self_loops[a] += self.self_loops[node];
            for (&neighbor, &weight) in &self.adjacency[node] {
                if neighbor < node {
                    continue; // each undirected edge once
                }
                let b = partition[neighbor];
                if a == b {
                    self_loops[a] += weight;
                } else {
                    *adjacency[a].entry(b).or_default() += weight;
                    *adjacency[b].entry(a).or_default() += weight;
                }
            }
        }
        LouvainLevel::new(adjacency, self_loops)
    }
}
