//! Sighting sink contract.

use crate::aggregate;
use gossipsim_types::{MessageUuid, NodeKey, Tick};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row per (message, node): when the node first and last saw the
/// message, and how many times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SightingRecord {
    pub uuid: MessageUuid,
    pub node: NodeKey,
    pub first_seen: Tick,
    pub last_seen: Tick,
    pub seen_count: u64,
}

impl SightingRecord {
    /// Row for a node's first sighting of a message.
    pub fn first(uuid: MessageUuid, node: NodeKey, tick: Tick) -> Self {
        Self {
            uuid,
            node,
            first_seen: tick,
            last_seen: tick,
            seen_count: 1,
        }
    }

    /// Apply a repeated sighting.
    ///
    /// Rejects ticks earlier than the first sighting: under correct
    /// simulation order a node cannot see a message before it first saw it.
    pub fn observe(&mut self, tick: Tick) -> Result<(), SinkError> {
        if tick < self.first_seen {
            return Err(SinkError::StaleSighting {
                uuid: self.uuid,
                node: self.node.clone(),
                tick,
                first_seen: self.first_seen,
            });
        }
        self.last_seen = self.last_seen.max(tick);
        self.seen_count += 1;
        Ok(())
    }
}

/// Errors raised by sighting sinks and the queries they answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    /// A sighting arrived with a tick before the recorded first sighting.
    #[error("sighting of message {uuid} at {node} on {tick} predates first sighting on {first_seen}")]
    StaleSighting {
        uuid: MessageUuid,
        node: NodeKey,
        tick: Tick,
        first_seen: Tick,
    },

    /// A run with this label already has data.
    #[error("run label {0:?} already has sightings; labels must be unique per run")]
    RunLabelInUse(String),

    /// No sightings exist for the message.
    #[error("no sightings recorded for message {0}")]
    UnknownMessage(MessageUuid),

    /// A node's latency came out negative.
    #[error("negative latency {latency} for message {uuid} at {node}")]
    NegativeLatency {
        uuid: MessageUuid,
        node: NodeKey,
        latency: i64,
    },

    /// A node saw the message before the tick it was known to originate.
    #[error("message {uuid} first seen at {node} on {first_seen}, earlier than expected {expected}")]
    UnexpectedFirstSeen {
        uuid: MessageUuid,
        node: NodeKey,
        first_seen: Tick,
        expected: Tick,
    },

    /// The backing store failed.
    #[error("sighting persistence failed: {0}")]
    Persistence(String),
}

/// Records sightings and answers aggregate queries over them.
///
/// `record_sighting` is an upsert: implementations must keep exactly one row
/// per (message, node) even under concurrent callers. The aggregate queries
/// have default implementations over [`sightings`](EventSink::sightings);
/// a store with a native query engine may override them.
pub trait EventSink: Send + Sync {
    /// Record that `node` saw `uuid` at `tick`.
    fn record_sighting(&self, uuid: MessageUuid, node: &NodeKey, tick: Tick)
        -> Result<(), SinkError>;

    /// All rows for a message, ordered by node key.
    fn sightings(&self, uuid: MessageUuid) -> Result<Vec<SightingRecord>, SinkError>;

    /// Every message with at least one sighting, in ascending order.
    fn distinct_message_ids(&self) -> Vec<MessageUuid>;

    /// Ticks between the first and the slowest first contact.
    fn latency(&self, uuid: MessageUuid) -> Result<u64, SinkError> {
        aggregate::latency(uuid, &self.sightings(uuid)?)
    }

    /// Ticks from a known injection tick to the slowest first contact.
    fn latency_since(&self, uuid: MessageUuid, expected_first: Tick) -> Result<u64, SinkError> {
        aggregate::latency_since(uuid, &self.sightings(uuid)?, expected_first)
    }

    /// Mean first-contact latency over recipients other than the origin.
    fn average_latency(&self, uuid: MessageUuid) -> Result<f64, SinkError> {
        aggregate::average_latency(uuid, &self.sightings(uuid)?)
    }

    /// Total redundant deliveries across the network.
    fn duplicate_count(&self, uuid: MessageUuid) -> Result<u64, SinkError> {
        Ok(aggregate::duplicate_count(&self.sightings(uuid)?))
    }

    /// Number of nodes that saw the message more than `threshold` times.
    fn duplicate_bucket(&self, uuid: MessageUuid, threshold: u64) -> Result<u64, SinkError> {
        Ok(aggregate::duplicate_bucket(&self.sightings(uuid)?, threshold))
    }
}
