//! Core abstractions for gossip propagation simulation.
//!
//! The orchestrator only ever talks to nodes, message sources and sighting
//! sinks through the traits defined here:
//!
//! ```text
//!  MessageSource ──new_messages(tick)──▶ SimulationRunner
//!                                            │
//!                         receive_message ◀──┤──▶ progress_queue / queue
//!                                            ▼
//!                                       GossipNode
//!                                            │ record_sighting
//!                                            ▼
//!                                        EventSink ──▶ analytics queries
//! ```
//!
//! Routing lives behind [`GossipNode`], so a non-flood strategy can replace
//! `gossipsim_node::FloodNode` without touching the runner.

pub mod aggregate;
mod sink;
mod traits;

pub use sink::{EventSink, SightingRecord, SinkError};
pub use traits::{GossipNode, MessageBatch, MessageSource, QueuedMessage, RelayQueue};
