/*
    Runs one simulated GHS network: generates a random connected graph, starts
    one task per node with an in-memory duplex channel per edge, waits for the
    protocol to settle and checks the BRANCH edges against a centrally computed
    minimum spanning tree.

    Logging goes through RUST_LOG (default "info"); "ghs_mst=debug" shows every
    message a node handles.
*/

use anyhow::{bail, Context};
use clap::Parser;
use ghs_mst::bootstrap::run_cluster;
use ghs_mst::common::{ClusterConfig, Density};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ghs-mst", about = "Distributed minimum spanning tree simulation")]
struct Cli {
    /// Number of nodes (2..=100).
    #[arg(short, long, default_value_t = 15)]
    nodes: usize,

    /// Generate a dense graph instead of a sparse one.
    #[arg(long)]
    dense: bool,

    /// Seed for graph generation.
    #[arg(long)]
    seed: Option<u64>,

    /// Buffer size of each channel direction, in bytes.
    #[arg(long, default_value_t = 1024)]
    channel_capacity: usize,

    /// Print the weight matrix of the generated graph.
    #[arg(long)]
    print_matrix: bool,
}

impl Cli {
    fn config(&self) -> ClusterConfig {
        ClusterConfig {
            nodes: self.nodes,
            density: if self.dense {
                Density::Dense
            } else {
                Density::Sparse
            },
            seed: self.seed,
            channel_capacity: self.channel_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    config.validate().context("invalid arguments")?;

    let (topology, seed) = config.generate().context("generating graph")?;
    info!(
        seed,
        nodes = topology.node_count(),
        edges = topology.edges().len(),
        density = ?config.density,
        "generated graph"
    );
    if cli.print_matrix {
        println!("{}", topology.adjacency_matrix());
    }

    let outcome = run_cluster(&topology, &config)
        .await
        .context("running cluster")?;

    let expected: Vec<u16> = topology
        .minimum_spanning_tree()
        .iter()
        .map(|edge| edge.weight)
        .collect();
    let found = outcome.tree_weights();

    for report in &outcome.reports {
        info!(
            node = report.id,
            level = report.level,
            fragment = report.fragment,
            branches = ?report.branches().collect::<Vec<_>>(),
            "node finished"
        );
    }

    if !outcome.disagreements().is_empty() {
        bail!(
            "edge ends disagree on {:?} (seed {})",
            outcome.disagreements(),
            seed
        );
    }
    if found != expected {
        bail!(
            "tree mismatch (seed {}): found {:?}, expected {:?}",
            seed,
            found,
            expected
        );
    }

    info!(
        edges = found.len(),
        total_weight = outcome.total_weight(),
        "minimum spanning tree verified"
    );
    println!("MST edges: {:?}", found);
    println!("MST weight: {}", outcome.total_weight());
    Ok(())
}
