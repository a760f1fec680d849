pub mod cluster;
pub mod graph;

pub use cluster::*;
pub use graph::*;
