//! corrnet CLI tool
//!
//! Command-line interface for driving the correlation-network pipeline
//! from files.
//!
//! ## Commands
//!
//! - `correlate <table>`: build a graph from a delimited table upload
//! - `filter <graph.json>`: run the structural filter chain
//! - `communities <graph.json>`: summarize communities

use clap::{Parser, Subcommand, ValueEnum};
use corrnet_core::{
    community::{summarize, SummarizeOptions},
    config::{get_content, PipelineConfigProvider, TomlConfigProvider},
    correlate::{compute_edges, CorrelationMethod, CorrelationParams},
    filter::{apply, AttribQuery, FilterParams},
    graph::Graph,
    table::{parse_delimited, TableShape},
    CorrNetError,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "corrnet")]
#[command(author, version, about = "Correlation network analytics pipeline", long_about = None)]
struct Cli {
    /// Pipeline config file providing session defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Pearson,
    Spearman,
}

impl From<MethodArg> for CorrelationMethod {
    fn from(value: MethodArg) -> CorrelationMethod {
        match value {
            MethodArg::Pearson => CorrelationMethod::Pearson,
            MethodArg::Spearman => CorrelationMethod::Spearman,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a delimited upload and emit its graph as JSON
    Correlate {
        /// Path to the delimited text file (comma or tab separated)
        path: PathBuf,

        /// Correlation method for raw observation tables
        #[arg(short, long)]
        method: Option<MethodArg>,

        /// Minimum absolute correlation to keep
        #[arg(long)]
        min_corr: Option<f64>,

        /// Keep negative correlations by absolute value
        #[arg(long)]
        take_abs: bool,

        /// Attrib name for the produced links
        #[arg(short, long)]
        attrib: Option<String>,
    },

    /// Apply the structural filter chain to a graph JSON file
    Filter {
        /// Path to the graph JSON file
        path: PathBuf,

        /// Keep only sub-edges with |weight| >= threshold
        #[arg(short, long, default_value_t = 0.0)]
        threshold: f64,

        /// Drop negative-weight sub-edges
        #[arg(long)]
        ignore_negatives: bool,

        /// Attribute query over node groups
        #[arg(long)]
        node_query: Option<String>,

        /// Attribute query over link attribs
        #[arg(long)]
        link_query: Option<String>,

        /// Case-insensitive id substrings to exclude
        #[arg(long = "exclude")]
        excluded: Vec<String>,

        /// Minimum connected-component size
        #[arg(long, default_value_t = 0)]
        min_comp_size: usize,

        /// Maximum connected-component size
        #[arg(long)]
        max_comp_size: Option<usize>,

        /// Iterative minimum-degree (k-core) threshold
        #[arg(long, default_value_t = 0)]
        min_degree: usize,

        /// Minimum component density
        #[arg(long, default_value_t = 0.0)]
        min_density: f64,
    },

    /// Summarize a graph's communities
    Communities {
        /// Path to the graph JSON file
        path: PathBuf,

        /// Resolution: 0 for connected components, > 0 for Louvain
        #[arg(short, long)]
        resolution: Option<f64>,

        /// Ranked attribute values reported per community
        #[arg(long)]
        top: Option<usize>,
    },
}

fn load_graph(path: &PathBuf) -> Result<Graph, CorrNetError> {
    let content = get_content(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Graph::from_json(&name, &value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let defaults = match &cli.config {
        Some(path) => TomlConfigProvider::new(path.clone()).get_defaults()?,
        None => Default::default(),
    };

    match cli.command {
        Commands::Correlate {
            path,
            method,
            min_corr,
            take_abs,
            attrib,
        } => {
            let content = get_content(&path)?;
            let table = parse_delimited(&content)
                .ok_or_else(|| CorrNetError::Parse("upload contains no rows".to_string()))?;
            let attrib = attrib.unwrap_or(defaults.link_attrib);
            let graph = match table.classify() {
                TableShape::Matrix => Graph::from_matrix(&table, &attrib)?,
                TableShape::Table => {
                    let params = CorrelationParams {
                        method: method
                            .map(CorrelationMethod::from)
                            .unwrap_or(defaults.correlation.method),
                        min_abs_corr: min_corr.unwrap_or(defaults.correlation.min_abs_corr),
                        take_abs: take_abs || defaults.correlation.take_abs,
                    };
                    let edges = compute_edges(&table.numeric_rows(), &params);
                    Graph::from_edges(&table.row_labels, &edges, &attrib)
                }
                TableShape::Unknown => {
                    return Err(CorrNetError::Parse(
                        "upload is neither a symmetric matrix nor a rectangular table".to_string(),
                    )
                    .into());
                }
            };
            println!("{}", serde_json::to_string_pretty(&graph.to_json()?)?);
        }
        Commands::Filter {
            path,
            threshold,
            ignore_negatives,
            node_query,
            link_query,
            excluded,
            min_comp_size,
            max_comp_size,
            min_degree,
            min_density,
        } => {
            let graph = load_graph(&path)?;
            let params = FilterParams {
                threshold,
                ignore_negatives,
                node_query: match node_query {
                    Some(text) => AttribQuery::parse(&text)?,
                    None => AttribQuery::default(),
                },
                link_query: match link_query {
                    Some(text) => AttribQuery::parse(&text)?,
                    None => AttribQuery::default(),
                },
                excluded_ids: excluded,
                min_component_size: min_comp_size,
                max_component_size: max_comp_size,
                min_core_degree: min_degree,
                min_component_density: min_density,
            };
            let (filtered, changed) = apply(&graph, &params);
            tracing::info!(?changed, "filter chain complete");
            println!("{}", serde_json::to_string_pretty(&filtered.to_json()?)?);
        }
        Commands::Communities {
            path,
            resolution,
            top,
        } => {
            let graph = load_graph(&path)?;
            let options = SummarizeOptions {
                resolution: resolution.unwrap_or(defaults.resolution),
                top_attributes: top.unwrap_or(defaults.top_attributes),
            };
            let summary = summarize(&graph, &options);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
