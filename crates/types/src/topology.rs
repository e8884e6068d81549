//! Undirected peer graph.

use crate::NodeKey;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// Errors raised while building a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// An edge names a node that was never added.
    #[error("edge {from} <-> {to} references unknown node {missing}")]
    UnknownNode {
        from: NodeKey,
        to: NodeKey,
        missing: NodeKey,
    },

    /// A node cannot peer with itself.
    #[error("node {0} cannot peer with itself")]
    SelfLoop(NodeKey),
}

/// Undirected graph of nodes keyed by [`NodeKey`].
///
/// Adjacency is stored as a map of sorted peer sets, so iteration order is
/// fixed and every edge is recorded on both endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    adjacency: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no peers. Adding an existing node is a no-op.
    pub fn add_node(&mut self, key: NodeKey) {
        self.adjacency.entry(key).or_default();
    }

    /// Connect two existing nodes. Re-adding an existing edge is a no-op.
    pub fn add_edge(&mut self, a: &NodeKey, b: &NodeKey) -> Result<(), TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLoop(a.clone()));
        }
        for key in [a, b] {
            if !self.adjacency.contains_key(key) {
                return Err(TopologyError::UnknownNode {
                    from: a.clone(),
                    to: b.clone(),
                    missing: key.clone(),
                });
            }
        }

        if let Some(peers) = self.adjacency.get_mut(a) {
            peers.insert(b.clone());
        }
        if let Some(peers) = self.adjacency.get_mut(b) {
            peers.insert(a.clone());
        }
        Ok(())
    }

    /// Build a topology from an edge list, adding endpoints as needed.
    pub fn from_edges<'a>(
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, TopologyError> {
        let mut topology = Self::new();
        for (a, b) in edges {
            let (a, b) = (NodeKey::new(a), NodeKey::new(b));
            topology.add_node(a.clone());
            topology.add_node(b.clone());
            topology.add_edge(&a, &b)?;
        }
        Ok(topology)
    }

    /// Check whether a node exists.
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.adjacency.contains_key(key)
    }

    /// Get a node's peers, in key order.
    pub fn peers(&self, key: &NodeKey) -> Option<&BTreeSet<NodeKey>> {
        self.adjacency.get(key)
    }

    /// Iterate over nodes and their peers, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &BTreeSet<NodeKey>)> {
        self.adjacency.iter()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Number of connected components.
    pub fn component_count(&self) -> usize {
        let mut visited = BTreeSet::new();
        let mut components = 0;
        for start in self.adjacency.keys() {
            if visited.contains(start) {
                continue;
            }
            components += 1;
            visited.extend(self.hop_distances(start).into_keys());
        }
        components
    }

    /// Whether the graph is a forest (no cycles in any component).
    pub fn is_acyclic(&self) -> bool {
        self.edge_count() + self.component_count() == self.node_count()
    }

    /// Breadth-first hop distance from `from` to every reachable node.
    pub fn hop_distances(&self, from: &NodeKey) -> BTreeMap<NodeKey, u64> {
        let mut distances = BTreeMap::new();
        if !self.contains(from) {
            return distances;
        }

        let mut frontier = VecDeque::from([(from.clone(), 0u64)]);
        distances.insert(from.clone(), 0);
        while let Some((node, hops)) = frontier.pop_front() {
            for peer in self.adjacency.get(&node).into_iter().flatten() {
                if !distances.contains_key(peer) {
                    distances.insert(peer.clone(), hops + 1);
                    frontier.push_back((peer.clone(), hops + 1));
                }
            }
        }
        distances
    }
}
