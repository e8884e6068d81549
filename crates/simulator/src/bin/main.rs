//! Gossip simulator CLI
//!
//! Replay captured gossip over a channel graph and print per-message
//! propagation summaries.
//!
//! # Example
//!
//! ```bash
//! # Replay one hour of messages starting at 14:00 UTC, one tick per minute
//! gossipsim --label july10 --graph graph.json --messages messages.json \
//!     --start-time "2019-07-10 14:00:00" --duration 60m
//!
//! # Keep sightings across runs and emit the summary as JSON
//! gossipsim -l july10-30s -g graph.json -m messages.json \
//!     --tick-interval 30s --sightings sightings.jsonl --json
//! ```

use clap::Parser;
use gossipsim_simulation::SimulationConfig;
use gossipsim_simulator::{Simulator, SimulatorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Gossip propagation simulator
///
/// Floods every captured message through the channel graph, one hop per
/// tick, and reports latency and duplicate statistics per message.
#[derive(Parser, Debug)]
#[command(name = "gossipsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Label for this run's sightings. Must not already exist in the sightings file.
    #[arg(short = 'l', long)]
    label: String,

    /// Channel graph from LND's describegraph call
    #[arg(short = 'g', long)]
    graph: PathBuf,

    /// Captured message log (JSON array)
    #[arg(short = 'm', long)]
    messages: PathBuf,

    /// Start of the replay window in UTC, e.g. "2019-07-10 14:00:00". Defaults to the first message.
    #[arg(long, value_parser = humantime::parse_rfc3339_weak)]
    start_time: Option<SystemTime>,

    /// Length of the replay window
    #[arg(short = 'd', long, default_value = "60m")]
    duration: humantime::Duration,

    /// Wall-clock time covered by one tick
    #[arg(long, default_value = "1m")]
    tick_interval: humantime::Duration,

    /// Stop after this many ticks even if messages are still in flight
    #[arg(long, default_value = "10000")]
    max_ticks: u64,

    /// Run without a tick cap
    #[arg(long, conflicts_with = "max_ticks")]
    no_tick_cap: bool,

    /// Read relay queues in parallel
    #[arg(long)]
    parallel: bool,

    /// JSON-lines file to load existing sightings from and append this run's to
    #[arg(long)]
    sightings: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn,gossipsim_simulator=info,gossipsim_simulation=info")
        }))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let simulation = if args.no_tick_cap {
        SimulationConfig::default().without_tick_cap()
    } else {
        SimulationConfig::default().with_max_ticks(args.max_ticks)
    }
    .with_parallel_fanout(args.parallel);

    let mut config = SimulatorConfig::new(args.label, args.graph, args.messages)
        .with_duration(*args.duration)
        .with_tick_interval(*args.tick_interval)
        .with_simulation(simulation);
    if let Some(start) = args.start_time {
        config = config.with_start_time(start);
    }
    if let Some(path) = args.sightings {
        config = config.with_sightings_path(path);
    }

    info!(
        label = %config.label,
        start = %window_start(args.start_time),
        duration = %args.duration,
        tick_interval = %args.tick_interval,
        parallel = args.parallel,
        "Starting gossip simulation"
    );

    let report = Simulator::new(config).run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
    } else {
        report.summary.print_summary();
    }
    Ok(())
}

fn window_start(start: Option<SystemTime>) -> String {
    match start {
        Some(start) => humantime::format_rfc3339_seconds(start).to_string(),
        None => "first message".to_string(),
    }
}
