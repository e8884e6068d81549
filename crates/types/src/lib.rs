//! Core types for gossip propagation simulation.
//!
//! This crate holds the plain data the rest of the workspace agrees on:
//! node keys, message identities, ticks, the immutable [`Message`] value and
//! the symmetric [`Topology`] the simulation runs over. It performs no I/O.

mod identifiers;
mod message;
mod topology;

pub use identifiers::{MessageUuid, NodeKey, ProtocolId, Tick, Timestamp};
pub use message::Message;
pub use topology::{Topology, TopologyError};
