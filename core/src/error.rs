use thiserror::Error;

use crate::graph::NodeId;

/// Failure reported by a [`GraphAccessor`](crate::GraphAccessor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("failed to read relationships of node {node}: {message}")]
    Read { node: NodeId, message: String },

    #[error("failed to scan nodes: {message}")]
    Scan { message: String },
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Any failure that aborts a traversal call. No partial result is returned.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("worker for shard {shard} failed: {source}")]
    WorkerFailed { shard: usize, source: AccessError },

    #[error("worker for shard {shard} panicked: {message}")]
    WorkerPanicked { shard: usize, message: String },

    #[error("traversal interrupted after {hops_completed} hops")]
    Interrupted { hops_completed: u32 },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = TraversalError> = std::result::Result<T, E>;
