use std::collections::BTreeMap;

use tokio::io::duplex;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::graph::Topology;
use crate::common::{ClusterConfig, GhsError};
use crate::ghs::EdgeStatus;
use crate::network::{Link, Node, NodeReport};

/// What every node reported once the run ended.
#[derive(Clone, Debug)]
pub struct ClusterOutcome {
    /// One report per node, ordered by node id.
    pub reports: Vec<NodeReport>,
}

impl ClusterOutcome {
    /// Weights of the edges classified BRANCH, ascending, each listed once.
    pub fn tree_weights(&self) -> Vec<u16> {
        let mut weights: Vec<u16> = self
            .reports
            .iter()
            .flat_map(|report| report.branches())
            .collect();
        weights.sort_unstable();
        weights.dedup();
        weights
    }

    pub fn total_weight(&self) -> u64 {
        self.tree_weights().iter().map(|&weight| u64::from(weight)).sum()
    }

    pub fn unknown_edges(&self) -> usize {
        self.reports
            .iter()
            .flat_map(|report| report.edges.iter())
            .filter(|(_, status)| *status == EdgeStatus::Unknown)
            .count()
    }

    /// Weights whose two ends ended up with different classifications.
    pub fn disagreements(&self) -> Vec<u16> {
        let mut seen: BTreeMap<u16, Vec<EdgeStatus>> = BTreeMap::new();
        for report in &self.reports {
            for &(weight, status) in &report.edges {
                seen.entry(weight).or_default().push(status);
            }
        }
        seen.into_iter()
            .filter(|(_, statuses)| statuses.windows(2).any(|pair| pair[0] != pair[1]))
            .map(|(weight, _)| weight)
            .collect()
    }
}

/// Wires one in-memory channel per edge, runs every node on its own task and
/// waits for all of them.
///
/// Finished nodes are kept alive until the last one is done so no channel
/// closes while its peer still needs it. A failed node is dropped at once,
/// which closes its channels and brings its neighbours down too.
pub async fn run_cluster(
    topology: &Topology,
    config: &ClusterConfig,
) -> Result<ClusterOutcome, GhsError> {
    config.validate()?;
    topology.validate()?;

    let mut links: Vec<Vec<Link>> = (0..topology.node_count()).map(|_| Vec::new()).collect();
    for edge in topology.edges() {
        let (a, b) = duplex(config.channel_capacity);
        links[edge.a].push(Link::from_stream(edge.weight, a));
        links[edge.b].push(Link::from_stream(edge.weight, b));
    }

    let nodes = links
        .into_iter()
        .enumerate()
        .map(|(id, node_links)| Node::new(id, node_links))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        nodes = topology.node_count(),
        edges = topology.edges().len(),
        "starting cluster"
    );

    let mut tasks = JoinSet::new();
    for mut node in nodes {
        tasks.spawn(async move {
            let result = node.run().await;
            (node, result)
        });
    }

    let mut finished = Vec::with_capacity(topology.node_count());
    let mut reports = Vec::with_capacity(topology.node_count());
    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((node, Ok(report))) => {
                reports.push(report);
                finished.push(node);
            }
            Ok((node, Err(err))) => {
                error!(node = node.id, error = %err, "node failed");
                drop(node);
                failure.get_or_insert(err);
            }
            Err(err) => {
                error!(error = %err, "node task failed");
                failure.get_or_insert(GhsError::Task(err.to_string()));
            }
        }
    }
    drop(finished);

    if let Some(err) = failure {
        return Err(err);
    }
    reports.sort_by_key(|report| report.id);
    Ok(ClusterOutcome { reports })
}
