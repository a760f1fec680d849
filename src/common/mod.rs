pub mod config;
pub mod error;

pub use config::{ClusterConfig, ConfigError, Density};
pub use error::GhsError;
