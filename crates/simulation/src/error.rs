//! Error types for the simulation runner.

use gossipsim_core::SinkError;
use gossipsim_types::NodeKey;
use thiserror::Error;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Recording a sighting failed; the run cannot produce valid analytics.
    #[error("Sighting persistence failed: {0}")]
    Sink(#[from] SinkError),

    /// Two nodes disagree about being peers.
    #[error("Asymmetric peering: {from} lists {to} as a peer but not the reverse")]
    AsymmetricPeering { from: NodeKey, to: NodeKey },

    /// The same key was supplied for two nodes.
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeKey),
}
