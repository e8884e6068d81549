//! Test fixtures for gossip simulations.
//!
//! Topology builders for the shapes the propagation tests care about
//! (lines, rings, grids, seeded random trees and cyclic graphs) and short
//! constructors for messages.

use gossipsim_types::{Message, MessageUuid, NodeKey, ProtocolId, Timestamp, Topology};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Key of the `i`th generated node. Zero-padded so key order matches index
/// order.
pub fn node_key(i: usize) -> NodeKey {
    NodeKey::new(format!("n{:04}", i))
}

fn with_nodes(count: usize) -> Topology {
    let mut topology = Topology::new();
    for i in 0..count {
        topology.add_node(node_key(i));
    }
    topology
}

fn connect(topology: &mut Topology, a: usize, b: usize) {
    topology
        .add_edge(&node_key(a), &node_key(b))
        .expect("fixture nodes exist and differ");
}

/// A path through the given keys in order.
pub fn line(keys: &[&str]) -> Topology {
    Topology::from_edges(keys.windows(2).map(|pair| (pair[0], pair[1])))
        .expect("line keys must be distinct")
}

/// A single cycle of `count` nodes (`count >= 3`).
pub fn ring(count: usize) -> Topology {
    assert!(count >= 3, "a ring needs at least 3 nodes");
    let mut topology = with_nodes(count);
    for i in 0..count {
        connect(&mut topology, i, (i + 1) % count);
    }
    topology
}

/// A `width` x `height` lattice; node `y * width + x`.
pub fn grid(width: usize, height: usize) -> Topology {
    let mut topology = with_nodes(width * height);
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if x + 1 < width {
                connect(&mut topology, i, i + 1);
            }
            if y + 1 < height {
                connect(&mut topology, i, i + width);
            }
        }
    }
    topology
}

/// A random spanning tree over `count` nodes: node `i` attaches to a
/// uniformly chosen earlier node.
pub fn random_tree(count: usize, seed: u64) -> Topology {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut topology = with_nodes(count);
    for i in 1..count {
        let parent = rng.gen_range(0..i);
        connect(&mut topology, i, parent);
    }
    topology
}

/// A random connected graph with at least one cycle: a random tree plus
/// `extra_edges` chords between non-adjacent nodes (`count >= 3`).
pub fn random_cyclic_graph(count: usize, extra_edges: usize, seed: u64) -> Topology {
    assert!(count >= 3, "a cycle needs at least 3 nodes");
    let mut topology = random_tree(count, seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    let mut candidates: Vec<(usize, usize)> = (0..count)
        .flat_map(|a| (a + 1..count).map(move |b| (a, b)))
        .filter(|&(a, b)| {
            !topology
                .peers(&node_key(a))
                .is_some_and(|peers| peers.contains(&node_key(b)))
        })
        .collect();
    candidates.shuffle(&mut rng);

    for &(a, b) in candidates.iter().take(extra_edges.max(1)) {
        connect(&mut topology, a, b);
    }
    topology
}

/// A single-origin message whose protocol id is derived from its uuid.
pub fn message(uuid: i64, origin: &str) -> Message {
    Message::new(
        MessageUuid(uuid),
        ProtocolId::new(format!("chan{}", uuid)),
        NodeKey::new(origin),
        Timestamp(1_000),
    )
}

/// A single-origin message with an explicit protocol id and timestamp.
pub fn update(uuid: i64, protocol_id: &str, origin: &str, timestamp: u64) -> Message {
    Message::new(
        MessageUuid(uuid),
        ProtocolId::new(protocol_id),
        NodeKey::new(origin),
        Timestamp(timestamp),
    )
}
