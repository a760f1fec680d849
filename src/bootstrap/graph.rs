use std::fmt::Write as _;

use rand::Rng;
use thiserror::Error;

use crate::ghs::INFINITY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("node {node} out of range for {nodes} nodes")]
    NodeOutOfRange { node: usize, nodes: usize },
    #[error("self loop on node {0}")]
    SelfLoop(usize),
    #[error("nodes {0} and {1} are already adjacent")]
    DuplicateEdge(usize, usize),
    #[error("weight {0} is used twice")]
    DuplicateWeight(u16),
    #[error("weight {0} is reserved")]
    ReservedWeight(u16),
    #[error("need at least 2 nodes, got {0}")]
    TooFewNodes(usize),
    #[error("graph is not connected")]
    Disconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphEdge {
    pub a: usize,
    pub b: usize,
    pub weight: u16,
}

/// Undirected graph with distinct edge weights. Only the bootstrap sees the
/// whole thing; each node is handed its own edges.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    nodes: usize,
    edges: Vec<GraphEdge>,
}

impl Topology {
    pub fn new(nodes: usize) -> Self {
        Topology {
            nodes,
            edges: Vec::new(),
        }
    }

    pub fn from_edges(nodes: usize, edges: &[(usize, usize, u16)]) -> Result<Self, TopologyError> {
        let mut topology = Topology::new(nodes);
        for &(a, b, weight) in edges {
            topology.add_edge(a, b, weight)?;
        }
        Ok(topology)
    }

    pub fn add_edge(&mut self, a: usize, b: usize, weight: u16) -> Result<(), TopologyError> {
        for node in [a, b] {
            if node >= self.nodes {
                return Err(TopologyError::NodeOutOfRange {
                    node,
                    nodes: self.nodes,
                });
            }
        }
        if a == b {
            return Err(TopologyError::SelfLoop(a));
        }
        if weight == 0 || weight == INFINITY {
            return Err(TopologyError::ReservedWeight(weight));
        }
        if self.adjacent(a, b) {
            return Err(TopologyError::DuplicateEdge(a, b));
        }
        if self.edges.iter().any(|edge| edge.weight == weight) {
            return Err(TopologyError::DuplicateWeight(weight));
        }
        self.edges.push(GraphEdge { a, b, weight });
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        self.edges
            .iter()
            .any(|edge| (edge.a == a && edge.b == b) || (edge.a == b && edge.b == a))
    }

    /// (neighbour, weight) pairs of `node`.
    pub fn neighbours(&self, node: usize) -> Vec<(usize, u16)> {
        self.edges
            .iter()
            .filter_map(|edge| {
                if edge.a == node {
                    Some((edge.b, edge.weight))
                } else if edge.b == node {
                    Some((edge.a, edge.weight))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        let mut sets = DisjointSet::new(self.nodes);
        for edge in &self.edges {
            sets.union(edge.a, edge.b);
        }
        sets.components() <= 1
    }

    /// Checks the graph can host a run: two or more nodes, all reachable.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.nodes < 2 {
            return Err(TopologyError::TooFewNodes(self.nodes));
        }
        if !self.is_connected() {
            return Err(TopologyError::Disconnected);
        }
        Ok(())
    }

    /// Reference MST computed centrally (Kruskal), ascending by weight.
    pub fn minimum_spanning_tree(&self) -> Vec<GraphEdge> {
        let mut sorted = self.edges.clone();
        sorted.sort_by_key(|edge| edge.weight);

        let mut sets = DisjointSet::new(self.nodes);
        sorted
            .into_iter()
            .filter(|edge| sets.union(edge.a, edge.b))
            .collect()
    }

    /// `(n-1)(n-2)/2 + 1` random edges; that many edges force a connected
    /// graph whatever their placement.
    pub fn dense<R: Rng>(nodes: usize, rng: &mut R) -> Result<Self, TopologyError> {
        if nodes < 2 {
            return Err(TopologyError::TooFewNodes(nodes));
        }
        let goal = (nodes - 1) * (nodes - 2) / 2 + 1;
        let mut generator = WeightGenerator::new(nodes);
        let mut topology = Topology::new(nodes);
        topology.add_random_edges(goal, &mut generator, rng)?;
        Ok(topology)
    }

    /// A path through every node, plus a handful of random extra edges.
    pub fn sparse<R: Rng>(nodes: usize, rng: &mut R) -> Result<Self, TopologyError> {
        if nodes < 2 {
            return Err(TopologyError::TooFewNodes(nodes));
        }
        let mut generator = WeightGenerator::new(nodes);
        let mut topology = Topology::new(nodes);
        for node in 0..nodes - 1 {
            let weight = generator.next(rng);
            topology.add_edge(node, node + 1, weight)?;
        }
        let goal = topology.edges.len() + rng.gen_range(0..nodes) + 5;
        topology.add_random_edges(goal, &mut generator, rng)?;
        Ok(topology)
    }

    fn add_random_edges<R: Rng>(
        &mut self,
        goal: usize,
        generator: &mut WeightGenerator,
        rng: &mut R,
    ) -> Result<(), TopologyError> {
        let goal = goal.min(self.nodes * (self.nodes - 1) / 2);
        while self.edges.len() < goal {
            let a = rng.gen_range(0..self.nodes);
            let b = rng.gen_range(0..self.nodes);
            if a == b || self.adjacent(a, b) {
                continue;
            }
            let weight = generator.next(rng);
            self.add_edge(a, b, weight)?;
        }
        Ok(())
    }

    /// Weight matrix, one row per node, tab separated, 0 for "no edge".
    pub fn adjacency_matrix(&self) -> String {
        let mut matrix = vec![0u16; self.nodes * self.nodes];
        for edge in &self.edges {
            matrix[edge.a * self.nodes + edge.b] = edge.weight;
            matrix[edge.b * self.nodes + edge.a] = edge.weight;
        }

        let mut out = String::new();
        for row in matrix.chunks(self.nodes.max(1)) {
            let cells: Vec<String> = row.iter().map(|weight| weight.to_string()).collect();
            let _ = writeln!(out, "{}", cells.join("\t"));
        }
        out
    }
}

/// Hands out distinct weights from `1..=n(n-1)`.
struct WeightGenerator {
    used: Vec<bool>,
}

impl WeightGenerator {
    fn new(nodes: usize) -> Self {
        let max = (nodes * (nodes - 1)).min(INFINITY as usize - 1);
        WeightGenerator {
            used: vec![false; max + 1],
        }
    }

    fn next<R: Rng>(&mut self, rng: &mut R) -> u16 {
        let max = self.used.len() - 1;
        loop {
            let weight = rng.gen_range(1..=max);
            if !self.used[weight] {
                self.used[weight] = true;
                return weight as u16;
            }
        }
    }
}

struct DisjointSet {
    parent: Vec<usize>,
    components: usize,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        DisjointSet {
            parent: (0..size).collect(),
            components: size,
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    /// Joins the sets of `a` and `b`; false if they already were one.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        self.components -= 1;
        true
    }

    fn components(&self) -> usize {
        self.components
    }
}
