//! Flood-routing state machine.

use gossipsim_core::{EventSink, GossipNode, QueuedMessage, RelayQueue, SinkError};
use gossipsim_types::{Message, NodeKey, ProtocolId, Tick};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::trace;

/// Latest version seen for a protocol id.
#[derive(Debug, Clone)]
struct CachedMessage {
    message: Arc<Message>,
    /// Peers that delivered this version; never relayed back to them.
    received_from: BTreeSet<NodeKey>,
}

/// A node that floods messages to all peers that have not yet sent them.
///
/// Deduplication is by protocol id, not uuid: a message with a later
/// timestamp replaces the cached one and is relayed again, anything else
/// only marks its sender as already having it.
#[derive(Debug, Clone)]
pub struct FloodNode {
    pubkey: NodeKey,
    peers: BTreeSet<NodeKey>,

    /// Protocol id -> latest version and its senders.
    cache: HashMap<ProtocolId, CachedMessage>,

    /// Accepted this tick, relayed after the next `progress_queue`.
    receive_queue: Vec<QueuedMessage>,

    /// Peer -> messages to send it this tick.
    relay_queue: RelayQueue,
}

impl FloodNode {
    /// Create a node with an initial peer list.
    pub fn new(pubkey: NodeKey, peers: impl IntoIterator<Item = NodeKey>) -> Self {
        Self {
            pubkey,
            peers: peers.into_iter().collect(),
            cache: HashMap::new(),
            receive_queue: Vec::new(),
            relay_queue: RelayQueue::new(),
        }
    }

    /// The cached version for a protocol id, if any.
    pub fn cached(&self, protocol_id: &ProtocolId) -> Option<&Arc<Message>> {
        self.cache.get(protocol_id).map(|c| &c.message)
    }

    /// Peers known to have delivered the cached version of a protocol id.
    pub fn received_from(&self, protocol_id: &ProtocolId) -> Option<&BTreeSet<NodeKey>> {
        self.cache.get(protocol_id).map(|c| &c.received_from)
    }

    /// Messages accepted for relay since the last `progress_queue`.
    pub fn pending_receive(&self) -> &[QueuedMessage] {
        &self.receive_queue
    }
}

impl GossipNode for FloodNode {
    fn pubkey(&self) -> &NodeKey {
        &self.pubkey
    }

    fn peers(&self) -> &BTreeSet<NodeKey> {
        &self.peers
    }

    fn add_peer(&mut self, peer: NodeKey) {
        self.peers.insert(peer);
    }

    fn receive_message(
        &mut self,
        sink: &dyn EventSink,
        message: Arc<Message>,
        tick: Tick,
        from: &NodeKey,
    ) -> Result<(), SinkError> {
        // Every copy is a sighting, including ones dropped below.
        sink.record_sighting(message.uuid, &self.pubkey, tick)?;

        match self.cache.get_mut(&message.protocol_id) {
            Some(cached) if !message.supersedes(&cached.message) => {
                trace!(
                    node = %self.pubkey,
                    uuid = %message.uuid,
                    from = %from,
                    "Not relaying duplicate or stale message"
                );
                cached.received_from.insert(from.clone());
            }
            _ => {
                trace!(
                    node = %self.pubkey,
                    uuid = %message.uuid,
                    from = %from,
                    %tick,
                    "Accepted message for relay"
                );
                self.receive_queue.push(QueuedMessage {
                    message: Arc::clone(&message),
                    received_from: from.clone(),
                });
                self.cache.insert(
                    message.protocol_id.clone(),
                    CachedMessage {
                        message,
                        received_from: BTreeSet::from([from.clone()]),
                    },
                );
            }
        }

        Ok(())
    }

    fn progress_queue(&mut self) {
        let mut relay = RelayQueue::new();

        for queued in self.receive_queue.drain(..) {
            let already_have = self
                .cache
                .get(&queued.message.protocol_id)
                .map(|c| &c.received_from);

            for peer in &self.peers {
                if already_have.is_some_and(|senders| senders.contains(peer)) {
                    continue;
                }
                relay.entry(peer.clone()).or_default().push(queued.clone());
            }
        }

        self.relay_queue = relay;
    }

    fn queue(&self) -> &RelayQueue {
        &self.relay_queue
    }
}
