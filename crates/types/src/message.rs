//! Gossip message value.

use crate::{MessageUuid, NodeKey, ProtocolId, Timestamp};
use serde::{Deserialize, Serialize};

/// A gossip message replayed through the simulation.
///
/// Messages are immutable for the duration of a run and are shared between
/// node queues behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Simulation-only unique id, keys sighting records.
    pub uuid: MessageUuid,

    /// Identity the network deduplicates on.
    pub protocol_id: ProtocolId,

    /// Node(s) that created the message.
    pub origin_nodes: Vec<NodeKey>,

    /// Creation time; breaks ties between updates sharing a protocol id.
    pub timestamp: Timestamp,
}

impl Message {
    /// Create a message with a single origin node.
    pub fn new(
        uuid: MessageUuid,
        protocol_id: ProtocolId,
        origin: NodeKey,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            uuid,
            protocol_id,
            origin_nodes: vec![origin],
            timestamp,
        }
    }

    /// Create a message originating at several nodes at once
    /// (e.g. a channel announcement signed by both endpoints).
    pub fn with_origins(
        uuid: MessageUuid,
        protocol_id: ProtocolId,
        origin_nodes: Vec<NodeKey>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            uuid,
            protocol_id,
            origin_nodes,
            timestamp,
        }
    }

    /// Whether `self` supersedes `cached` for the same protocol id.
    pub fn supersedes(&self, cached: &Message) -> bool {
        cached.timestamp.is_before(self.timestamp)
    }

    /// Whether `node` is one of this message's origins.
    pub fn originates_at(&self, node: &NodeKey) -> bool {
        self.origin_nodes.iter().any(|o| o == node)
    }
}
