//! Configuration for the simulation runner.

/// Tick cap applied when none is configured explicitly.
pub const DEFAULT_MAX_TICKS: u64 = 10_000;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Hard stop after this many ticks, regardless of the termination
    /// condition. `None` runs until the network is quiet.
    pub max_ticks: Option<u64>,

    /// Read relay queues on the rayon pool.
    ///
    /// Deliveries are still applied serially in node-key order, so results
    /// do not depend on this flag.
    pub parallel_fanout: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: Some(DEFAULT_MAX_TICKS),
            parallel_fanout: false,
        }
    }
}

impl SimulationConfig {
    /// Set the tick cap.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Remove the tick cap.
    pub fn without_tick_cap(mut self) -> Self {
        self.max_ticks = None;
        self
    }

    /// Enable or disable the parallel read phase.
    pub fn with_parallel_fanout(mut self, parallel: bool) -> Self {
        self.parallel_fanout = parallel;
        self
    }
}
