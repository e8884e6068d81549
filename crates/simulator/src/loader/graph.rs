//! Channel graph loader.
//!
//! Reads the JSON produced by LND's `describegraph` call. Only the fields
//! the simulation needs are decoded; everything else in the dump is ignored.

use super::open;
use crate::error::LoadError;
use gossipsim_types::{NodeKey, Topology};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ChannelGraph {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<ChannelEdge>,
}

#[derive(Debug, Deserialize)]
struct GraphNode {
    pub_key: NodeKey,
}

#[derive(Debug, Deserialize)]
struct ChannelEdge {
    #[serde(default, deserialize_with = "integer_or_string")]
    channel_id: u64,
    node1_pub: NodeKey,
    node2_pub: NodeKey,
    #[serde(default, deserialize_with = "integer_or_string")]
    capacity: u64,
}

/// LND encodes 64-bit integers as JSON strings.
fn integer_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Number(u64),
        Text(String),
    }

    match Encoded::deserialize(deserializer)? {
        Encoded::Number(value) => Ok(value),
        Encoded::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

/// Build a topology from a `describegraph` dump.
///
/// Every listed node is added, then every edge peers its two endpoints with
/// each other. An edge naming a node missing from `nodes` is rejected.
pub fn read_channel_graph(reader: impl Read) -> Result<Topology, LoadError> {
    let graph: ChannelGraph = serde_json::from_reader(reader)?;

    let mut topology = Topology::new();
    for node in &graph.nodes {
        topology.add_node(node.pub_key.clone());
    }

    let mut capacity: u64 = 0;
    for edge in &graph.edges {
        for endpoint in [&edge.node1_pub, &edge.node2_pub] {
            if !topology.contains(endpoint) {
                return Err(LoadError::UnknownEdgeNode {
                    channel_id: edge.channel_id,
                    node: endpoint.clone(),
                });
            }
        }
        topology.add_edge(&edge.node1_pub, &edge.node2_pub)?;
        capacity = capacity.saturating_add(edge.capacity);
    }

    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        capacity_sat = capacity,
        "Read channel graph"
    );
    Ok(topology)
}

/// Read a `describegraph` dump from disk.
pub fn load_channel_graph(path: &Path) -> Result<Topology, LoadError> {
    read_channel_graph(open(path)?)
}
