//! # corrnet-core
//!
//! A Rust library for turning tabular biological measurements into
//! filterable, community-annotated correlation networks.
//!
//! ## Overview
//!
//! corrnet-core is the analytics core of an interactive network viewer:
//! it ingests delimited text (a symmetric correlation matrix or a raw
//! observation table), derives a correlation-weighted multigraph, and
//! applies a composable chain of structural filters to produce the graph a
//! rendering layer actually draws. Everything is deterministic and
//! renderer-agnostic: rendering, UI state and storage live outside this
//! crate and consume it through plain values.
//!
//! ### Key Features
//!
//! - **Shape detection**: uploaded tables are classified as correlation
//!   matrix vs. observation table before any computation runs
//! - **Correlation engine**: Pearson/Spearman with pairwise exclusion of
//!   missing values, reproducible rounding, and an off-thread worker for
//!   large inputs
//! - **Multigraph model**: undirected links carry parallel
//!   `(attrib, weight)` pairs, one per uploaded dataset
//! - **Composable filters**: weight threshold, boolean attribute queries,
//!   id exclusion, component size, k-core and density, all pure
//!   `Graph -> Graph` functions
//! - **Attribute query language**: a small CNF grammar with negation,
//!   set grouping and cardinality comparisons, parsed to an immutable AST
//! - **Community detection**: connected components or deterministic
//!   Louvain, with per-community statistics and staleness tracking
//!
//! ## Architecture
//!
//! The library is organized around several key components:
//!
//! - **[`table`]**: delimited-text ingestion and shape detection
//! - **[`correlate`]**: the pairwise correlation scan
//! - **[`graph`]**: the canonical graph model, builders, merge/union and
//!   connected components
//! - **[`filter`]**: the structural filter chain and the attribute query
//!   language
//! - **[`community`]**: community detection and summaries
//! - **[`verify`]**: structural verification of imported graphs
//! - **[`worker`]**: the lifecycle-managed correlation worker service
//! - **[`config`]**: persisted pipeline defaults
//!
//! ## Quick Start
//!
//! Parse an observation table, correlate it, filter the graph and
//! summarize its communities:
//!
//! ```rust
//! use corrnet_core::{
//!     community::{summarize, SummarizeOptions},
//!     correlate::{compute_edges, CorrelationParams},
//!     filter::{apply, FilterParams},
//!     graph::Graph,
//!     table::{parse_delimited, TableShape},
//!     CorrNetError,
//! };
//!
//! fn main() -> Result<(), CorrNetError> {
//!     let upload = "gene,s1,s2,s3,s4\nA,1,2,3,4\nB,2,4,6,8\nC,4,3,2,1\n";
//!     let table = parse_delimited(upload)
//!         .ok_or_else(|| CorrNetError::Parse("empty upload".to_string()))?;
//!     assert_eq!(table.classify(), TableShape::Table);
//!
//!     let edges = compute_edges(&table.numeric_rows(), &CorrelationParams::default());
//!     let graph = Graph::from_edges(&table.row_labels, &edges, "demo dataset");
//!
//!     let params = FilterParams {
//!         threshold: 0.9,
//!         ..FilterParams::default()
//!     };
//!     let (filtered, _changed) = apply(&graph, &params);
//!
//!     let summary = summarize(&filtered, &SummarizeOptions::default());
//!     for community in &summary.communities {
//!         println!("{}: {} nodes", community.label, community.size);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Multilinks
//!
//! A link between two nodes is one conceptual edge carrying several named,
//! independently weighted sub-edges (`weights[i]` belongs to
//! `attribs[i]`). Merging two uploads unions sub-edges per link; the
//! weight threshold prunes sub-edges individually, and a link whose last
//! sub-edge is pruned disappears.
//!
//! ### The filter chain
//!
//! Filters apply in a fixed order (threshold → sign policy → attribute
//! queries → id exclusion → component size → k-core → density). Each
//! stage is a pure function with a no-op short-circuit, so the chain is
//! cheap to re-run when a single parameter changes, and
//! [`filter::apply`] reports which stages changed the graph.
//!
//! ### Derived summaries and staleness
//!
//! Community summaries record the signature of the graph they were built
//! from and the resolution used. When either changes the summary reports
//! itself stale; recomputation is explicit, so rapid UI parameter changes
//! do not trigger redundant Louvain runs.
//!
//! ## Features
//!
//! - **default**: the full analytics pipeline
//! - **bin**: the `corrnet` CLI (`correlate`, `filter`, `communities`)

pub mod community;
pub mod config;
pub mod correlate;
pub mod error;
pub mod filter;
pub mod graph;
pub mod table;
#[cfg(test)]
mod tests;
pub mod verify;
pub mod worker;

pub use error::*;
