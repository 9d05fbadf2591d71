use crate::types::NodeId;
use thiserror::Error;

/// Errors that can occur in the epidemic simulator.
#[derive(Error, Debug)]
pub enum SimError {
    /// Node count could not be parsed as a non-negative integer.
    #[error("invalid node count: {0:?}")]
    InvalidNodeCount(String),

    /// Topology token is not one of `full`, `3D`, `line`, `imp3D`.
    #[error("unknown topology: {0:?} (expected one of: full, 3D, line, imp3D)")]
    UnknownTopology(String),

    /// Algorithm token is not one of `gossip`, `push-sum`.
    #[error("unknown algorithm: {0:?} (expected one of: gossip, push-sum)")]
    UnknownAlgorithm(String),

    /// Simulation parameters are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A node's mailbox closed before it could be wired or queried.
    #[error("node {0} is unavailable")]
    NodeUnavailable(NodeId),

    /// Task execution failed.
    #[error("task execution failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
