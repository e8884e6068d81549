//! Gossip propagation simulator.
//!
//! Replays a captured log of gossip messages over a channel graph with
//! flood routing and reports how each message spread: latency, average
//! latency, duplicate deliveries and coverage.
//!
//! # Example
//!
//! ```ignore
//! use gossipsim_simulator::{Simulator, SimulatorConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new("july10", "graph.json", "messages.json")
//!     .with_duration(Duration::from_secs(3600))
//!     .with_sightings_path("sightings.jsonl");
//!
//! let report = Simulator::new(config).run()?;
//! report.summary.print_summary();
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod loader;
pub mod runner;

pub use analytics::{
    DuplicateBucket, LatencyDistribution, MessageSummary, RunSummary, DUPLICATE_THRESHOLDS,
};
pub use config::{SimulatorConfig, DEFAULT_DURATION, DEFAULT_TICK_INTERVAL};
pub use error::{LoadError, SimulatorError};
pub use loader::MessageWindow;
pub use runner::{simulate, SimulationReport, Simulator};
