use rand::rngs::StdRng;
use rand::{random, SeedableRng};
use thiserror::Error;

use crate::bootstrap::{Topology, TopologyError};

pub const MIN_NODES: usize = 2;
pub const MAX_NODES: usize = 100;

/// Smallest channel buffer that still fits the largest frame.
pub const MIN_CHANNEL_CAPACITY: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("node count {0} outside 2..=100")]
    NodeCount(usize),
    #[error("channel capacity {0} is below the largest frame (7 bytes)")]
    ChannelCapacity(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Density {
    /// A path through all nodes plus a few extra edges.
    Sparse,
    /// `(n-1)(n-2)/2 + 1` edges.
    Dense,
}

/// Parameters of a simulated run.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub nodes: usize,
    pub density: Density,
    /// Seed for graph generation. A random one is drawn when unset.
    pub seed: Option<u64>,
    /// Buffer size, in bytes, of each in-memory channel direction.
    pub channel_capacity: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            nodes: 15,
            density: Density::Sparse,
            seed: None,
            channel_capacity: 1024,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_NODES..=MAX_NODES).contains(&self.nodes) {
            return Err(ConfigError::NodeCount(self.nodes));
        }
        if self.channel_capacity < MIN_CHANNEL_CAPACITY {
            return Err(ConfigError::ChannelCapacity(self.channel_capacity));
        }
        Ok(())
    }

    /// Generates the graph for this run. Returns the seed actually used so the
    /// run can be reproduced.
    pub fn generate(&self) -> Result<(Topology, u64), TopologyError> {
        let seed = self.seed.unwrap_or_else(random);
        let mut rng = StdRng::seed_from_u64(seed);
        let topology = match self.density {
            Density::Sparse => Topology::sparse(self.nodes, &mut rng)?,
            Density::Dense => Topology::dense(self.nodes, &mut rng)?,
        };
        Ok((topology, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(ClusterConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_bounds() {
        let config = ClusterConfig {
            nodes: 101,
            ..ClusterConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NodeCount(101)));

        let config = ClusterConfig {
            channel_capacity: 3,
            ..ClusterConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ChannelCapacity(3)));
    }

    #[test]
    fn test_same_seed_same_graph() {
        let config = ClusterConfig {
            nodes: 12,
            density: Density::Dense,
            seed: Some(99),
            ..ClusterConfig::default()
        };
        let (first, seed) = config.generate().unwrap();
        let (second, _) = config.generate().unwrap();

        assert_eq!(seed, 99);
        assert_eq!(first.edges(), second.edges());
    }
}
