//! Core traits for simulated gossip nodes and message sources.

use crate::{EventSink, SinkError};
use gossipsim_types::{Message, NodeKey, Tick};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A message waiting in a node's relay queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// The message to relay.
    pub message: Arc<Message>,

    /// The peer that delivered this version to the relaying node.
    ///
    /// The runner never hands the message back to this peer.
    pub received_from: NodeKey,
}

/// Destination peer -> messages to send it on the next tick.
///
/// A `BTreeMap` so that fan-out order is fixed by key.
pub type RelayQueue = BTreeMap<NodeKey, Vec<QueuedMessage>>;

/// A simulated gossip participant.
///
/// Implementations are plain state machines:
///
/// - **Synchronous**: no async, no blocking beyond the sink call
/// - **Deterministic**: the same sequence of calls yields the same queues
/// - **Two-phase**: messages received during a tick only become relayable
///   after [`progress_queue`](GossipNode::progress_queue)
///
/// # Tick protocol
///
/// For each tick the runner calls, in order:
///
/// 1. `receive_message` for injected and relayed messages
/// 2. `queue` on every node (read phase)
/// 3. `progress_queue` on every node, only once every node has been read
pub trait GossipNode: Send + Sync {
    /// The node's key.
    fn pubkey(&self) -> &NodeKey;

    /// Keys of the nodes this node is connected to, in key order.
    fn peers(&self) -> &BTreeSet<NodeKey>;

    /// Connect to a peer. Adding an existing peer is a no-op.
    fn add_peer(&mut self, peer: NodeKey);

    /// Receive a message from `from` at `tick`.
    ///
    /// Always records a sighting. Fails only if the sink fails, which the
    /// caller must treat as fatal.
    fn receive_message(
        &mut self,
        sink: &dyn EventSink,
        message: Arc<Message>,
        tick: Tick,
        from: &NodeKey,
    ) -> Result<(), SinkError>;

    /// Turn this tick's received messages into the relay queue for the next
    /// tick, replacing the previous one.
    fn progress_queue(&mut self);

    /// The current relay queue.
    fn queue(&self) -> &RelayQueue;
}

/// Messages originating at a tick.
#[derive(Debug, Clone, Default)]
pub struct MessageBatch {
    /// Messages to inject at their origin nodes.
    pub messages: Vec<Arc<Message>>,

    /// No non-empty batch exists after this tick.
    pub exhausted: bool,
}

/// Supplies newly originating messages per tick.
///
/// Must be deterministic for a given tick. The runner calls it exactly once
/// per tick, even after it reports exhaustion.
pub trait MessageSource {
    /// Messages that originate at `tick`.
    fn new_messages(&self, tick: Tick) -> MessageBatch;
}
