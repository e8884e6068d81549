//! End-to-end wiring: inputs, sighting store, simulation, summary.

use crate::analytics::RunSummary;
use crate::config::SimulatorConfig;
use crate::error::SimulatorError;
use crate::loader::{load_channel_graph, load_message_log};
use gossipsim_simulation::{BucketedSource, SimulationConfig, SimulationRunner, SimulationStats};
use gossipsim_storage::{RunSightings, SightingDb};
use gossipsim_types::Topology;
use tracing::info;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub stats: SimulationStats,
    pub summary: RunSummary,
}

/// Loads a channel graph and message log, replays the messages and
/// summarizes the sightings.
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run the configured simulation.
    ///
    /// The run label is claimed before any input is read. Sightings are only
    /// persisted once the run and its summary have both succeeded.
    pub fn run(&self) -> Result<SimulationReport, SimulatorError> {
        let db = match &self.config.sightings_path {
            Some(path) => SightingDb::open_file(path)?,
            None => SightingDb::new(),
        };
        let sink = db.open_run(&self.config.label)?;

        info!(path = %self.config.graph_path.display(), "Reading channel graph");
        let topology = load_channel_graph(&self.config.graph_path)?;

        info!(path = %self.config.messages_path.display(), "Reading message log");
        let source = load_message_log(&self.config.messages_path, &self.config.window())?;

        let report = simulate(&topology, &source, &sink, self.config.simulation.clone())?;

        if let Some(path) = &self.config.sightings_path {
            sink.append_to_file(path)?;
        }
        Ok(report)
    }
}

/// Replay `source` over `topology`, recording into `sink`, and summarize.
pub fn simulate(
    topology: &Topology,
    source: &BucketedSource,
    sink: &RunSightings,
    config: SimulationConfig,
) -> Result<SimulationReport, SimulatorError> {
    let mut runner: SimulationRunner = SimulationRunner::from_topology(topology, config);
    let stats = runner.run(source, sink)?;
    let summary = RunSummary::collect(sink.label(), sink, &stats, &source.injection_ticks())?;
    Ok(SimulationReport { stats, summary })
}
