//! Tick-driven gossip simulation runner.
//!
//! This crate replays originating messages through a graph of
//! [`GossipNode`](gossipsim_core::GossipNode)s one synchronous exchange at a
//! time. Given the same topology and message source it produces identical
//! sightings every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner::tick                 │
//! │                                                         │
//! │  1. Injection   MessageSource ──▶ origin nodes          │
//! │                                                         │
//! │  2. Read phase  every node.queue() ──▶ Vec<Delivery>    │
//! │                 (optionally in parallel with rayon)     │
//! │                                                         │
//! │  3. Write phase deliveries ──▶ peer.receive_message     │
//! │                 (serial, fixed key order)               │
//! │                                                         │
//! │  4. Barrier     every node.progress_queue()             │
//! │                                                         │
//! │  5. Done?       nothing queued && source exhausted      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Queues are only advanced after every node has been read, so a message
//! received during a tick is relayed no earlier than the next one.

mod config;
mod error;
mod runner;
mod source;

pub use config::{SimulationConfig, DEFAULT_MAX_TICKS};
pub use error::SimulationError;
pub use runner::{Delivery, SimulationRunner, SimulationStats, TickResult};
pub use source::BucketedSource;
