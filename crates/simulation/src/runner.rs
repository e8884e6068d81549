//! Tick-driven simulation runner.
//!
//! Each tick injects the source's new messages at their origins, fans every
//! node's relay queue out to its peers and then advances all queues. The
//! run ends once a tick leaves nothing queued and the source is exhausted.

use crate::{SimulationConfig, SimulationError};
use gossipsim_core::{EventSink, GossipNode, MessageSource, QueuedMessage};
use gossipsim_node::FloodNode;
use gossipsim_types::{Message, NodeKey, Tick, Topology};
use indexmap::map::Entry;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A single message hand-off planned during the read phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Relaying node.
    pub from: NodeKey,
    /// Destination peer.
    pub to: NodeKey,
    /// The peer that gave `from` this message version.
    pub received_from: NodeKey,
    pub message: Arc<Message>,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickResult {
    /// Tick counter after this tick.
    pub tick: Tick,
    /// Origin deliveries to nodes present in the topology.
    pub nodes_known: u64,
    /// Origin nodes missing from the topology.
    pub nodes_unknown: u64,
    /// Relay deliveries to peers present in the topology.
    pub peers_known: u64,
    /// Relay destinations missing from the topology.
    pub peers_unknown: u64,
    /// Queue entries dropped because the destination was the sender.
    pub echoes_suppressed: u64,
    /// Messages waiting in relay queues for the next tick.
    pub queued: u64,
    /// The run is finished.
    pub done: bool,
    /// The run was stopped by the tick cap rather than going quiet.
    pub capped: bool,
}

/// Statistics accumulated over a run.
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Nodes in the topology.
    pub node_count: usize,
    /// Ticks executed.
    pub ticks: u64,
    /// Messages pulled from the source.
    pub messages_injected: u64,
    pub nodes_known: u64,
    pub nodes_unknown: u64,
    pub peers_known: u64,
    pub peers_unknown: u64,
    pub echoes_suppressed: u64,
    /// The tick cap ended the run.
    pub capped: bool,
}

impl SimulationStats {
    fn absorb(&mut self, result: &TickResult) {
        self.ticks = result.tick.0;
        self.nodes_known += result.nodes_known;
        self.nodes_unknown += result.nodes_unknown;
        self.peers_known += result.peers_known;
        self.peers_unknown += result.peers_unknown;
        self.echoes_suppressed += result.echoes_suppressed;
        self.capped |= result.capped;
    }

    /// Fraction of origin lookups that missed the topology.
    pub fn unknown_node_ratio(&self) -> f64 {
        ratio(self.nodes_unknown, self.nodes_known + self.nodes_unknown)
    }

    /// Fraction of relay lookups that missed the topology.
    pub fn unknown_peer_ratio(&self) -> f64 {
        ratio(self.peers_unknown, self.peers_known + self.peers_unknown)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Drives discrete ticks over a graph of gossip nodes.
///
/// Nodes live in an arena keyed by [`NodeKey`] and sorted once at
/// construction; peers refer to each other by key only. The topology is
/// read-only once the runner exists.
pub struct SimulationRunner<N: GossipNode = FloodNode> {
    nodes: IndexMap<NodeKey, N>,
    tick: Tick,
    config: SimulationConfig,
    stats: SimulationStats,
}

impl SimulationRunner<FloodNode> {
    /// Build a flood-routing network from a topology.
    pub fn from_topology(topology: &Topology, config: SimulationConfig) -> Self {
        let nodes = topology
            .iter()
            .map(|(key, peers)| (key.clone(), FloodNode::new(key.clone(), peers.iter().cloned())))
            .collect();
        Self::from_arena(nodes, config)
    }
}

impl<N: GossipNode> SimulationRunner<N> {
    /// Create a runner over pre-built nodes.
    ///
    /// Peer lists must be symmetric between nodes that both exist. Peers
    /// missing from the node set are allowed and counted as gaps at run
    /// time.
    pub fn new(
        nodes: impl IntoIterator<Item = N>,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        let mut arena = IndexMap::new();
        for node in nodes {
            match arena.entry(node.pubkey().clone()) {
                Entry::Occupied(e) => return Err(SimulationError::DuplicateNode(e.key().clone())),
                Entry::Vacant(e) => {
                    e.insert(node);
                }
            }
        }

        for (key, node) in &arena {
            for peer in node.peers() {
                if let Some(other) = arena.get(peer) {
                    if !other.peers().contains(key) {
                        return Err(SimulationError::AsymmetricPeering {
                            from: key.clone(),
                            to: peer.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self::from_arena(arena, config))
    }

    fn from_arena(mut nodes: IndexMap<NodeKey, N>, config: SimulationConfig) -> Self {
        nodes.sort_keys();
        let stats = SimulationStats {
            node_count: nodes.len(),
            ..Default::default()
        };
        Self {
            nodes,
            tick: Tick::ZERO,
            config,
            stats,
        }
    }

    /// Current tick counter.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a node.
    pub fn node(&self, key: &NodeKey) -> Option<&N> {
        self.nodes.get(key)
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Runner configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Read every node's relay queue and plan this tick's deliveries.
    ///
    /// Entries addressed to the peer that supplied the message are dropped
    /// here, independently of the node's own cache check. Returns the
    /// planned deliveries in node-key order and the number dropped.
    pub fn plan_deliveries(&self) -> (Vec<Delivery>, u64) {
        let per_node: Vec<(Vec<Delivery>, u64)> = if self.config.parallel_fanout {
            self.nodes
                .par_iter()
                .map(|(key, node)| plan_node(key, node))
                .collect()
        } else {
            self.nodes
                .iter()
                .map(|(key, node)| plan_node(key, node))
                .collect()
        };

        let mut suppressed = 0;
        let mut deliveries = Vec::new();
        for (node_deliveries, node_suppressed) in per_node {
            deliveries.extend(node_deliveries);
            suppressed += node_suppressed;
        }
        (deliveries, suppressed)
    }

    /// Advance the network by one tick.
    ///
    /// Topology gaps are logged and counted; a sink failure aborts the tick
    /// and is returned.
    pub fn tick(
        &mut self,
        source: &dyn MessageSource,
        sink: &dyn EventSink,
    ) -> Result<TickResult, SimulationError> {
        let tick = self.tick;
        let mut result = TickResult::default();

        // Injection: origins receive their own messages.
        let batch = source.new_messages(tick);
        if batch.messages.is_empty() {
            debug!(%tick, "No new messages for tick");
        }
        self.stats.messages_injected += batch.messages.len() as u64;
        for message in &batch.messages {
            for origin in &message.origin_nodes {
                match self.nodes.get_mut(origin) {
                    Some(node) => {
                        result.nodes_known += 1;
                        node.receive_message(sink, Arc::clone(message), tick, origin)?;
                    }
                    None => {
                        result.nodes_unknown += 1;
                        warn!(%tick, node = %origin, uuid = %message.uuid, "Cannot find origin node in graph");
                    }
                }
            }
        }

        // Fan-out: plan from a consistent snapshot of every queue, then deliver.
        let (deliveries, suppressed) = self.plan_deliveries();
        result.echoes_suppressed = suppressed;
        for delivery in deliveries {
            match self.nodes.get_mut(&delivery.to) {
                Some(peer) => {
                    result.peers_known += 1;
                    peer.receive_message(sink, delivery.message, tick, &delivery.from)?;
                }
                None => {
                    result.peers_unknown += 1;
                    warn!(
                        %tick,
                        node = %delivery.from,
                        peer = %delivery.to,
                        "Cannot find peer in graph"
                    );
                }
            }
        }

        // Barrier: no queue advances until every queue has been read above.
        for node in self.nodes.values_mut() {
            node.progress_queue();
        }
        result.queued = self
            .nodes
            .values()
            .map(|node| node.queue().values().map(Vec::len).sum::<usize>() as u64)
            .sum();

        self.tick = tick.next();
        result.tick = self.tick;
        result.done = result.queued == 0 && batch.exhausted;

        if let Some(max_ticks) = self.config.max_ticks {
            if self.tick.0 >= max_ticks {
                if !result.done {
                    warn!(max_ticks, queued = result.queued, "Tick cap reached before network went quiet");
                    result.capped = true;
                }
                result.done = true;
            }
        }

        debug!(
            tick = self.tick.0,
            delivered = result.peers_known,
            queued = result.queued,
            done = result.done,
            "Tick complete"
        );

        self.stats.absorb(&result);
        Ok(result)
    }

    /// Tick until done, returning the run statistics.
    pub fn run(
        &mut self,
        source: &dyn MessageSource,
        sink: &dyn EventSink,
    ) -> Result<SimulationStats, SimulationError> {
        let start = Instant::now();
        info!(nodes = self.nodes.len(), "Starting simulation");

        loop {
            let result = self.tick(source, sink)?;
            if result.done {
                break;
            }
        }

        info!(
            ticks = self.stats.ticks,
            runtime = ?start.elapsed(),
            unknown_peers = self.stats.unknown_peer_ratio(),
            unknown_nodes = self.stats.unknown_node_ratio(),
            capped = self.stats.capped,
            "Ending simulation"
        );
        Ok(self.stats.clone())
    }
}

fn plan_node<N: GossipNode>(key: &NodeKey, node: &N) -> (Vec<Delivery>, u64) {
    let mut deliveries = Vec::new();
    let mut suppressed = 0;
    for (peer, messages) in node.queue() {
        for QueuedMessage {
            message,
            received_from,
        } in messages
        {
            if received_from == peer {
                suppressed += 1;
                continue;
            }
            deliveries.push(Delivery {
                from: key.clone(),
                to: peer.clone(),
                received_from: received_from.clone(),
                message: Arc::clone(message),
            });
        }
    }
    (deliveries, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BucketedSource;
    use gossipsim_storage::SightingDb;
    use gossipsim_types::{MessageUuid, ProtocolId, Timestamp};

    fn line() -> Topology {
        Topology::from_edges([("A", "B"), ("B", "C")]).unwrap()
    }

    fn message(uuid: i64, origin: &str) -> Message {
        Message::new(
            MessageUuid(uuid),
            ProtocolId::new(format!("chan{uuid}")),
            NodeKey::new(origin),
            Timestamp(100),
        )
    }

    #[test]
    fn test_asymmetric_peering_rejected() {
        let nodes = vec![
            FloodNode::new("A".into(), ["B".into()]),
            FloodNode::new("B".into(), []),
        ];
        let err = SimulationRunner::new(nodes, SimulationConfig::default()).err();
        assert!(matches!(err, Some(SimulationError::AsymmetricPeering { .. })));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let nodes = vec![
            FloodNode::new("A".into(), []),
            FloodNode::new("A".into(), []),
        ];
        let err = SimulationRunner::new(nodes, SimulationConfig::default()).err();
        assert!(matches!(err, Some(SimulationError::DuplicateNode(k)) if k.as_str() == "A"));
    }

    #[test]
    fn test_peer_outside_graph_is_allowed() {
        let nodes = vec![FloodNode::new("A".into(), ["ghost".into()])];
        assert!(SimulationRunner::new(nodes, SimulationConfig::default()).is_ok());
    }

    #[test]
    fn test_one_tick_propagation_delay() {
        let db = SightingDb::new();
        let sink = db.open_run("delay").unwrap();
        let mut runner = SimulationRunner::from_topology(&line(), SimulationConfig::default());
        let mut source = BucketedSource::new();
        source.push(Tick(0), message(1, "A"));

        let first = runner.tick(&source, &sink).unwrap();
        assert_eq!(first.tick, Tick(1));
        assert_eq!(first.peers_known, 0, "injected messages are not relayed in the same tick");
        assert_eq!(first.queued, 1);
        assert!(!first.done);

        let second = runner.tick(&source, &sink).unwrap();
        assert_eq!(second.peers_known, 1);
        assert_eq!(sink.sightings(MessageUuid(1)).unwrap().len(), 2);
    }

    #[test]
    fn test_plan_deliveries_drops_echo_entries() {
        let mut node = FloodNode::new("A".into(), ["B".into(), "C".into()]);
        let db = SightingDb::new();
        let sink = db.open_run("echo").unwrap();
        node.receive_message(&sink, Arc::new(message(1, "B")), Tick(0), &"B".into())
            .unwrap();
        node.progress_queue();

        let runner = SimulationRunner::new(
            vec![
                node,
                FloodNode::new("B".into(), ["A".into()]),
                FloodNode::new("C".into(), ["A".into()]),
            ],
            SimulationConfig::default(),
        )
        .unwrap();

        let (deliveries, suppressed) = runner.plan_deliveries();
        assert_eq!(suppressed, 0, "the node already skipped its sender");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, NodeKey::new("C"));
        assert_eq!(deliveries[0].received_from, NodeKey::new("B"));
    }

    #[test]
    fn test_superseded_copy_not_echoed_to_its_sender() {
        let v1 = Message::new(MessageUuid(1), ProtocolId::new("c"), "P".into(), Timestamp(1));
        let v2 = Message::new(MessageUuid(2), ProtocolId::new("c"), "Q".into(), Timestamp(2));

        let db = SightingDb::new();
        let sink = db.open_run("supersede").unwrap();
        let mut node = FloodNode::new("A".into(), ["P".into(), "Q".into(), "R".into()]);
        node.receive_message(&sink, Arc::new(v1), Tick(0), &"P".into())
            .unwrap();
        node.receive_message(&sink, Arc::new(v2), Tick(0), &"Q".into())
            .unwrap();
        node.progress_queue();

        // v2 reset the sender set to {Q}, so the node itself queues v1 back to P.
        let runner = SimulationRunner::new(
            vec![
                node,
                FloodNode::new("P".into(), ["A".into()]),
                FloodNode::new("Q".into(), ["A".into()]),
                FloodNode::new("R".into(), ["A".into()]),
            ],
            SimulationConfig::default(),
        )
        .unwrap();

        let (deliveries, suppressed) = runner.plan_deliveries();
        assert_eq!(suppressed, 1);
        assert!(!deliveries
            .iter()
            .any(|d| d.message.uuid == MessageUuid(1) && d.to == NodeKey::new("P")));

        let planned: Vec<_> = deliveries
            .iter()
            .map(|d| (d.to.as_str(), d.message.uuid.0))
            .collect();
        assert_eq!(planned, vec![("P", 2), ("R", 1), ("R", 2)]);
    }

    #[test]
    fn test_tick_cap_stops_run() {
        let db = SightingDb::new();
        let sink = db.open_run("cap").unwrap();
        let topology = Topology::from_edges([("A", "B"), ("B", "C"), ("C", "D")]).unwrap();
        let mut runner =
            SimulationRunner::from_topology(&topology, SimulationConfig::default().with_max_ticks(2));
        let mut source = BucketedSource::new();
        source.push(Tick(0), message(1, "A"));

        let stats = runner.run(&source, &sink).unwrap();
        assert_eq!(stats.ticks, 2);
        assert!(stats.capped);
        assert_eq!(sink.sightings(MessageUuid(1)).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_origin_counted() {
        let db = SightingDb::new();
        let sink = db.open_run("gaps").unwrap();
        let mut runner = SimulationRunner::from_topology(&line(), SimulationConfig::default());
        let mut source = BucketedSource::new();
        source.push(Tick(0), message(1, "nowhere"));

        let result = runner.tick(&source, &sink).unwrap();
        assert_eq!(result.nodes_unknown, 1);
        assert_eq!(result.nodes_known, 0);
        assert!(result.done);
        assert!(sink.distinct_message_ids().is_empty());
    }

    #[test]
    fn test_unknown_peer_counted_and_run_continues() {
        let db = SightingDb::new();
        let sink = db.open_run("ghost").unwrap();
        let nodes = vec![
            FloodNode::new("A".into(), ["B".into(), "ghost".into()]),
            FloodNode::new("B".into(), ["A".into()]),
        ];
        let mut runner = SimulationRunner::new(nodes, SimulationConfig::default()).unwrap();
        let mut source = BucketedSource::new();
        source.push(Tick(0), message(1, "A"));

        let stats = runner.run(&source, &sink).unwrap();
        assert_eq!(stats.peers_unknown, 1);
        assert_eq!(stats.peers_known, 1);
        assert_eq!(stats.unknown_peer_ratio(), 0.5);
        assert_eq!(sink.sightings(MessageUuid(1)).unwrap().len(), 2);
    }
}
