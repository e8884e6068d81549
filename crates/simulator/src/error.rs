//! Error types for loading inputs and running a simulation end to end.

use gossipsim_core::SinkError;
use gossipsim_simulation::SimulationError;
use gossipsim_types::{MessageUuid, NodeKey, TopologyError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the channel graph or the message log.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel {channel_id} references unknown node {node}")]
    UnknownEdgeNode { channel_id: u64, node: NodeKey },

    #[error("Invalid channel graph: {0}")]
    Topology(#[from] TopologyError),

    #[error("Message {0} has no origin nodes")]
    NoOrigin(MessageUuid),

    #[error("Duplicate message uuid {0}")]
    DuplicateMessage(MessageUuid),

    #[error("Invalid message window: {0}")]
    InvalidWindow(String),
}

/// Top-level errors for [`Simulator::run`](crate::Simulator::run).
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Failed to build latency histogram: {0}")]
    Histogram(String),
}
