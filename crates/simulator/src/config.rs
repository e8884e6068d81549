//! Configuration for an end-to-end simulator run.

use crate::loader::MessageWindow;
use gossipsim_simulation::SimulationConfig;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Default replay window length.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60 * 60);

/// Default width of one tick in wall-clock time.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a simulator run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Label scoping this run's sightings.
    pub label: String,

    /// Channel graph in LND `describegraph` format.
    pub graph_path: PathBuf,

    /// Captured message log.
    pub messages_path: PathBuf,

    /// Start of the replay window. `None` starts at the first message.
    pub start_time: Option<SystemTime>,

    /// Length of the replay window.
    pub duration: Duration,

    /// Wall-clock time covered by one tick.
    pub tick_interval: Duration,

    /// JSON-lines file sightings are loaded from and appended to.
    pub sightings_path: Option<PathBuf>,

    /// Orchestrator settings.
    pub simulation: SimulationConfig,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(
        label: impl Into<String>,
        graph_path: impl Into<PathBuf>,
        messages_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            graph_path: graph_path.into(),
            messages_path: messages_path.into(),
            start_time: None,
            duration: DEFAULT_DURATION,
            tick_interval: DEFAULT_TICK_INTERVAL,
            sightings_path: None,
            simulation: SimulationConfig::default(),
        }
    }

    /// Set the start of the replay window.
    pub fn with_start_time(mut self, start: SystemTime) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Set the length of the replay window.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the tick width.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Persist sightings to a JSON-lines file.
    pub fn with_sightings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sightings_path = Some(path.into());
        self
    }

    /// Set the orchestrator configuration.
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// The message window described by this configuration.
    pub fn window(&self) -> MessageWindow {
        let window = MessageWindow::new(self.duration, self.tick_interval);
        match self.start_time {
            Some(start) => window.with_start(start),
            None => window,
        }
    }
}
