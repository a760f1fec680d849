use std::io;

use thiserror::Error;

use super::config::ConfigError;
use crate::bootstrap::TopologyError;
use crate::ghs::codec::CodecError;

#[derive(Debug, Error)]
pub enum GhsError {
    #[error("malformed message: {0}")]
    Malformed(#[from] CodecError),
    #[error("no local edge with weight {0}")]
    UnknownEdge(u16),
    #[error("channel for edge {weight} closed: {reason}")]
    ChannelClosed { weight: u16, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("node has no edges")]
    NoEdges,
    #[error("edge weight {0} already present")]
    DuplicateWeight(u16),
    #[error("edge weight {0} is reserved")]
    ReservedWeight(u16),
    #[error("level went down from {current} to {received}")]
    LevelRegression { current: u8, received: u8 },
    #[error("level overflow")]
    LevelOverflow,
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("node task failed: {0}")]
    Task(String),
}
