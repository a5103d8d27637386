//! The structural filter chain.
//!
//! Every filter is a pure `Graph -> Graph` function, independently callable
//! and safe on empty graphs. [`apply`] composes them in the fixed pipeline
//! order (threshold → sign policy → attribute queries → node-id exclusion →
//! component size → k-core → component density), re-normalizing dangling
//! links after each node-removing stage so that link-inspecting stages only
//! ever see valid endpoints.

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::graph::{components::Components, Graph};

pub mod query;

pub use query::{AttribQuery, QueryCache};

/// Pipeline stages, in application order. [`apply`] reports the set of
/// stages that actually changed the graph, which is what tells the caller
/// whether derived state (community summaries) went stale.
#[derive(EnumSetType, Debug, Hash, Serialize, Deserialize)]
pub enum FilterStage {
    Threshold,
    IgnoreNegatives,
    NodeQuery,
    LinkQuery,
    NodeExclusion,
    ComponentSize,
    KCore,
    Density,
}

/// Parameters for one filter run. Defaults are all no-ops: applying the
/// default parameters returns the input graph unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Keep only sub-edges with `|weight| >= threshold`; 0 disables.
    pub threshold: f64,
    /// Drop negative-weight sub-edges.
    pub ignore_negatives: bool,
    /// Attribute query over node groups; match-all disables.
    pub node_query: AttribQuery,
    /// Attribute query over link attribs; match-all disables.
    pub link_query: AttribQuery,
    /// Case-insensitive id substrings; matching nodes are dropped.
    pub excluded_ids: Vec<String>,
    /// Minimum connected-component size; 0/1 disables.
    pub min_component_size: usize,
    /// Maximum connected-component size; unbounded when unset.
    pub max_component_size: Option<usize>,
    /// Iterative minimum-degree pruning threshold; 0 disables.
    pub min_core_degree: usize,
    /// Minimum component density (`2·links/size`); 0 disables.
    pub min_component_density: f64,
}

/// Run the full chain over `graph`, returning the filtered snapshot and
/// the stages that modified it.
#[tracing::instrument(skip(graph, params), fields(nodes = graph.node_count(), links = graph.link_count()))]
pub fn apply(graph: &Graph, params: &FilterParams) -> (Graph, EnumSet<FilterStage>) {
    let mut changed = EnumSet::empty();
    let mut current = graph.clone();
    let stages: [(FilterStage, fn(&Graph, &FilterParams) -> Graph); 8] = [
        (FilterStage::Threshold, |g, p| {
            filter_threshold(g, p.threshold)
        }),
        (FilterStage::IgnoreNegatives, |g, p| {
            filter_ignore_negatives(g, p.ignore_negatives)
        }),
        (FilterStage::NodeQuery, |g, p| {
            filter_node_attribs(g, &p.node_query)
        }),
        (FilterStage::LinkQuery, |g, p| {
            filter_link_attribs(g, &p.link_query)
        }),
        (FilterStage::NodeExclusion, |g, p| {
            filter_excluded_ids(g, &p.excluded_ids)
        }),
        (FilterStage::ComponentSize, |g, p| {
            filter_component_size(g, p.min_component_size, p.max_component_size)
        }),
        (FilterStage::KCore, |g, p| filter_k_core(g, p.min_core_degree)),
        (FilterStage::Density, |g, p| {
            filter_component_density(g, p.min_component_density)
        }),
    ];
    for (stage, filter) in stages {
        let next = filter(&current, params);
        if next != current {
            changed |= stage;
            tracing::debug!(
                ?stage,
                nodes = next.node_count(),
                links = next.link_count(),
                "filter stage changed graph"
            );
            current = next;
        }
    }
    (current, changed)
}

/// Keep only `(attrib, weight)` pairs with `|weight| >= threshold`; links
/// left without sub-edges are dropped. `threshold == 0` is the identity.
pub fn filter_threshold(graph: &Graph, threshold: f64) -> Graph {
    if threshold == 0.0 {
        return graph.clone();
    }
    retain_sub_edges(graph, |weight| weight.abs() >= threshold)
}

/// Drop negative-weight sub-edges when enabled.
pub fn filter_ignore_negatives(graph: &Graph, enabled: bool) -> Graph {
    if !enabled {
        return graph.clone();
    }
    retain_sub_edges(graph, |weight| weight >= 0.0)
}

fn retain_sub_edges<F: Fn(f64) -> bool>(graph: &Graph, keep: F) -> Graph {
    let mut filtered = graph.clone();
    for link in &mut filtered.data.links {
        let kept: Vec<(f64, String)> = link
            .weights
            .iter()
            .zip(link.attribs.iter())
            .filter(|(w, _)| keep(**w))
            .map(|(w, a)| (*w, a.clone()))
            .collect();
        link.weights = kept.iter().map(|(w, _)| *w).collect();
        link.attribs = kept.into_iter().map(|(_, a)| a).collect();
    }
    filtered.data.links.retain(|link| !link.is_void());
    filtered
}

/// Keep nodes whose groups satisfy `query`. The match-all query is the
/// identity.
pub fn filter_node_attribs(graph: &Graph, query: &AttribQuery) -> Graph {
    if query.is_match_all() {
        return graph.clone();
    }
    let mut filtered = graph.clone();
    filtered.retain_nodes(|node| query.matches(&node.groups));
    filtered
}

/// Keep links whose attribs satisfy `query`. The match-all query is the
/// identity.
pub fn filter_link_attribs(graph: &Graph, query: &AttribQuery) -> Graph {
    if query.is_match_all() {
        return graph.clone();
    }
    let mut filtered = graph.clone();
    filtered.data.links.retain(|link| query.matches(&link.attribs));
    filtered
}

/// Drop nodes whose id contains any of `substrings`, case-insensitively.
pub fn filter_excluded_ids(graph: &Graph, substrings: &[String]) -> Graph {
    if substrings.is_empty() {
        return graph.clone();
    }
    let needles: Vec<String> = substrings
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if needles.is_empty() {
        return graph.clone();
    }
    let mut filtered = graph.clone();
    filtered.retain_nodes(|node| {
        let id = node.id.to_lowercase();
        !needles.iter().any(|needle| id.contains(needle))
    });
    filtered
}

/// Keep nodes whose connected component has size within `[min, max]`.
pub fn filter_component_size(graph: &Graph, min: usize, max: Option<usize>) -> Graph {
    if min <= 1 && max.is_none() {
        return graph.clone();
    }
    let components = Components::compute(graph);
    let upper = max.unwrap_or(usize::MAX);
    let mut filtered = graph.clone();
    filtered.retain_nodes(|node| {
        components
            .size_of(&node.id)
            .is_some_and(|size| size >= min && size <= upper)
    });
    filtered
}

/// Iteratively remove nodes of degree `< k` (and their incident links)
/// until a fixed point. `k == 0` is the identity; the result is its own
/// fixed point, so re-running the filter is a no-op.
pub fn filter_k_core(graph: &Graph, k: usize) -> Graph {
    if k == 0 {
        return graph.clone();
    }
    let mut filtered = graph.clone();
    loop {
        let degrees = filtered.degrees();
        let before = filtered.node_count();
        filtered.retain_nodes(|node| degrees.get(&node.id).is_some_and(|&d| d >= k));
        if filtered.node_count() == before {
            return filtered;
        }
    }
}

/// Drop nodes whose component's average degree falls below `threshold`.
pub fn filter_component_density(graph: &Graph, threshold: f64) -> Graph {
    if threshold <= 0.0 {
        return graph.clone();
    }
    let components = Components::compute(graph);
    let mut filtered = graph.clone();
    filtered.retain_nodes(|node| {
        components
            .density_of(&node.id)
            .is_some_and(|density| density >= threshold)
    });
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Node};
    use test_log::test;

    fn link(a: &str, b: &str, weights: &[f64], attribs: &[&str]) -> Link {
        Link::new(
            a,
            b,
            weights.to_vec(),
            attribs.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn graph(nodes: &[&str], links: Vec<Link>) -> Graph {
        let mut g = Graph::new("test");
        g.data.nodes = nodes.iter().map(|s| Node::new(*s)).collect();
        g.data.links = links;
        g
    }

    /// Two disjoint fully-connected triangles.
    fn two_triangles() -> Graph {
        graph(
            &["a", "b", "c", "x", "y", "z"],
            vec![
                link("a", "b", &[0.9], &["m"]),
                link("b", "c", &[0.8], &["m"]),
                link("a", "c", &[0.7], &["m"]),
                link("x", "y", &[0.9], &["m"]),
                link("y", "z", &[0.8], &["m"]),
                link("x", "z", &[0.7], &["m"]),
            ],
        )
    }

    #[test]
    fn threshold_prunes_sub_edges_and_empty_links() {
        let g = graph(
            &["a", "b"],
            vec![link("a", "b", &[0.9, 0.3], &["set1", "set2"])],
        );
        let filtered = filter_threshold(&g, 0.5);
        assert_eq!(filtered.data.links[0].weights, vec![0.9]);
        assert_eq!(filtered.data.links[0].attribs, vec!["set1"]);

        let emptied = filter_threshold(&g, 0.95);
        assert_eq!(emptied.link_count(), 0);
        assert_eq!(emptied.node_count(), 2);
    }

    #[test]
    fn threshold_zero_is_identity() {
        let g = two_triangles();
        assert_eq!(filter_threshold(&g, 0.0), g);
    }

    #[test]
    fn threshold_is_monotonic() {
        let g = two_triangles();
        let loose = filter_threshold(&g, 0.75);
        let tight = filter_threshold(&g, 0.85);
        let loose_keys: Vec<_> = loose.data.links.iter().map(|l| l.key()).collect();
        for link in &tight.data.links {
            assert!(loose_keys.contains(&link.key()));
        }
        assert!(tight.link_count() <= loose.link_count());
    }

    #[test]
    fn negative_weights_dropped_when_enabled() {
        let g = graph(
            &["a", "b"],
            vec![link("a", "b", &[-0.9, 0.8], &["down", "up"])],
        );
        let kept = filter_ignore_negatives(&g, false);
        assert_eq!(kept, g);
        let filtered = filter_ignore_negatives(&g, true);
        assert_eq!(filtered.data.links[0].attribs, vec!["up"]);
    }

    #[test]
    fn node_query_removes_nodes_and_dangling_links() {
        let mut g = two_triangles();
        for node in &mut g.data.nodes {
            if ["a", "b", "c"].contains(&node.id.as_str()) {
                node.groups.push("lean group".to_string());
            } else {
                node.groups.push("obese group".to_string());
            }
        }
        let query = AttribQuery::parse("not lean").unwrap();
        let filtered = filter_node_attribs(&g, &query);
        assert_eq!(filtered.node_ids(), vec!["x", "y", "z"]);
        assert_eq!(filtered.link_count(), 3);
        for link in &filtered.data.links {
            assert!(["x", "y", "z"].contains(&link.source.as_str()));
        }
    }

    #[test]
    fn link_query_filters_by_attrib() {
        let g = graph(
            &["a", "b", "c"],
            vec![
                link("a", "b", &[0.9], &["liver dataset"]),
                link("b", "c", &[0.8], &["muscle dataset"]),
            ],
        );
        let query = AttribQuery::parse("liver").unwrap();
        let filtered = filter_link_attribs(&g, &query);
        assert_eq!(filtered.link_count(), 1);
        assert_eq!(filtered.data.links[0].attribs, vec!["liver dataset"]);
    }

    #[test]
    fn excluded_ids_match_substrings_case_insensitively() {
        let g = graph(&["Insulin_A", "Glucagon_B", "other"], vec![]);
        let filtered = filter_excluded_ids(&g, &["insulin".to_string()]);
        assert_eq!(filtered.node_ids(), vec!["Glucagon_B", "other"]);
    }

    #[test]
    fn component_size_bounds() {
        // Scenario: two triangles, min size 4 ⇒ everything removed.
        let g = two_triangles();
        let filtered = filter_component_size(&g, 4, None);
        assert_eq!(filtered.node_count(), 0);
        assert_eq!(filtered.link_count(), 0);

        // Max bound removes both triangles too.
        let capped = filter_component_size(&g, 0, Some(2));
        assert_eq!(capped.node_count(), 0);

        // Within bounds everything survives.
        let kept = filter_component_size(&g, 3, Some(3));
        assert_eq!(kept.node_count(), 6);
    }

    #[test]
    fn component_size_idempotent() {
        let g = two_triangles();
        let once = filter_component_size(&g, 3, None);
        let twice = filter_component_size(&once, 3, None);
        assert_eq!(once, twice);
    }

    #[test]
    fn k_core_peels_iteratively() {
        // A triangle with a pendant chain: d - a, where a,b,c form the
        // triangle. k=2 must peel d, and the triangle survives.
        let g = graph(
            &["a", "b", "c", "d"],
            vec![
                link("a", "b", &[1.0], &["m"]),
                link("b", "c", &[1.0], &["m"]),
                link("a", "c", &[1.0], &["m"]),
                link("a", "d", &[1.0], &["m"]),
            ],
        );
        let filtered = filter_k_core(&g, 2);
        assert_eq!(filtered.node_ids(), vec!["a", "b", "c"]);

        // Chain only: k=2 cascades until nothing is left.
        let chain = graph(
            &["a", "b", "c"],
            vec![
                link("a", "b", &[1.0], &["m"]),
                link("b", "c", &[1.0], &["m"]),
            ],
        );
        assert_eq!(filter_k_core(&chain, 2).node_count(), 0);
    }

    #[test]
    fn k_core_fixed_point() {
        let g = two_triangles();
        let once = filter_k_core(&g, 2);
        let twice = filter_k_core(&once, 2);
        assert_eq!(once, twice);
    }

    #[test]
    fn density_filter_drops_sparse_components() {
        // Triangle density 2.0; pair density 1.0.
        let mut g = two_triangles();
        g.data.nodes.push(Node::new("p"));
        g.data.nodes.push(Node::new("q"));
        g.data.links.push(link("p", "q", &[0.9], &["m"]));
        let filtered = filter_component_density(&g, 1.5);
        assert_eq!(filtered.node_count(), 6);
        assert!(!filtered.node_ids().contains(&"p"));
    }

    #[test]
    fn filters_safe_on_empty_graph() {
        let empty = Graph::new("empty");
        assert_eq!(filter_threshold(&empty, 0.5), empty);
        assert_eq!(filter_k_core(&empty, 3), empty);
        assert_eq!(filter_component_size(&empty, 2, Some(5)), empty);
        assert_eq!(filter_component_density(&empty, 1.0), empty);
        let (out, changed) = apply(&empty, &FilterParams::default());
        assert_eq!(out, empty);
        assert!(changed.is_empty());
    }

    #[test]
    fn apply_reports_changed_stages() {
        let mut g = two_triangles();
        g.data.links[0].weights = vec![0.2];
        let params = FilterParams {
            threshold: 0.5,
            min_core_degree: 2,
            ..FilterParams::default()
        };
        let (filtered, changed) = apply(&g, &params);
        assert!(changed.contains(FilterStage::Threshold));
        assert!(changed.contains(FilterStage::KCore));
        assert!(!changed.contains(FilterStage::Density));
        // Threshold breaks the first triangle, k-core then peels it away.
        assert_eq!(filtered.node_count(), 3);
    }

    #[test]
    fn default_params_are_identity() {
        let g = two_triangles();
        let (out, changed) = apply(&g, &FilterParams::default());
        assert_eq!(out, g);
        assert!(changed.is_empty());
    }
}
