//! Post-run propagation analytics.
//!
//! Once a run completes, every distinct message recorded by the sink is
//! summarized: how long it took to reach its last recipient, how long the
//! average recipient waited, and how many redundant copies the network
//! carried. [`RunSummary`] rolls those up into a latency distribution.

use crate::error::SimulatorError;
use gossipsim_core::{EventSink, SinkError};
use gossipsim_simulation::SimulationStats;
use gossipsim_types::{MessageUuid, Tick};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::BTreeMap;

/// Seen-count thresholds reported for every message, in print order.
pub const DUPLICATE_THRESHOLDS: [u64; 5] = [0, 1, 5, 10, 100];

/// Number of nodes that saw a message more than `threshold` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateBucket {
    pub threshold: u64,
    pub nodes: u64,
}

/// Propagation statistics for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSummary {
    pub message_id: MessageUuid,
    /// Ticks from first network contact to the last recipient's first sighting.
    pub latency: u64,
    pub average_latency: f64,
    pub duplicate_count: u64,
    pub duplicate_buckets: Vec<DuplicateBucket>,
    /// Nodes that saw the message at least once.
    pub recipients: u64,
    /// Whether every node in the network saw the message.
    pub reached_all: bool,
}

impl MessageSummary {
    /// Query the sink for one message's statistics.
    ///
    /// With `injected_at`, latency is measured from that tick and a sighting
    /// before it is reported as a consistency error.
    pub fn for_message(
        sink: &dyn EventSink,
        uuid: MessageUuid,
        node_count: usize,
        injected_at: Option<Tick>,
    ) -> Result<Self, SinkError> {
        let latency = match injected_at {
            Some(tick) => sink.latency_since(uuid, tick)?,
            None => sink.latency(uuid)?,
        };

        let duplicate_buckets = DUPLICATE_THRESHOLDS
            .iter()
            .map(|&threshold| {
                Ok(DuplicateBucket {
                    threshold,
                    nodes: sink.duplicate_bucket(uuid, threshold)?,
                })
            })
            .collect::<Result<Vec<_>, SinkError>>()?;

        // Threshold 0 counts every recipient.
        let recipients = duplicate_buckets.first().map_or(0, |bucket| bucket.nodes);

        Ok(Self {
            message_id: uuid,
            latency,
            average_latency: sink.average_latency(uuid)?,
            duplicate_count: sink.duplicate_count(uuid)?,
            duplicate_buckets,
            recipients,
            reached_all: recipients == node_count as u64,
        })
    }

    /// Number of nodes past `threshold`, if it is one of the reported ones.
    pub fn bucket(&self, threshold: u64) -> Option<u64> {
        self.duplicate_buckets
            .iter()
            .find(|bucket| bucket.threshold == threshold)
            .map(|bucket| bucket.nodes)
    }

    pub fn print(&self) {
        println!(
            "Summary for message: {}, latency: {}, average ticks: {:.2}, duplicates: {}",
            self.message_id, self.latency, self.average_latency, self.duplicate_count
        );
        for bucket in &self.duplicate_buckets {
            println!(
                "  Nodes that received message more than {} times: {}",
                bucket.threshold, bucket.nodes
            );
        }
        if self.reached_all {
            println!("  Seen by entire network of {} nodes", self.recipients);
        }
        println!();
    }
}

/// Per-message latency distribution in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyDistribution {
    pub p50: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

impl LatencyDistribution {
    fn from_latencies(latencies: impl Iterator<Item = u64>) -> Result<Self, SimulatorError> {
        let mut histogram = Histogram::<u64>::new(3)
            .map_err(|e| SimulatorError::Histogram(e.to_string()))?;
        for latency in latencies {
            histogram
                .record(latency)
                .map_err(|e| SimulatorError::Histogram(e.to_string()))?;
        }

        if histogram.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            p50: histogram.value_at_quantile(0.5),
            p99: histogram.value_at_quantile(0.99),
            max: histogram.max(),
            mean: histogram.mean(),
        })
    }
}

/// Summary of a whole run: one entry per message plus roll-ups.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub node_count: usize,
    pub ticks: u64,
    pub capped: bool,
    pub unknown_node_ratio: f64,
    pub unknown_peer_ratio: f64,
    pub echoes_suppressed: u64,
    pub latency: LatencyDistribution,
    pub total_duplicates: u64,
    /// Messages seen by every node.
    pub fully_propagated: usize,
    pub messages: Vec<MessageSummary>,
}

impl RunSummary {
    /// Summarize every message the sink recorded, in uuid order.
    ///
    /// `injected_at` holds the expected first tick of each message; messages
    /// missing from it fall back to plain latency.
    pub fn collect(
        label: &str,
        sink: &dyn EventSink,
        stats: &SimulationStats,
        injected_at: &BTreeMap<MessageUuid, Tick>,
    ) -> Result<Self, SimulatorError> {
        let messages = sink
            .distinct_message_ids()
            .into_iter()
            .map(|uuid| {
                MessageSummary::for_message(
                    sink,
                    uuid,
                    stats.node_count,
                    injected_at.get(&uuid).copied(),
                )
            })
            .collect::<Result<Vec<_>, SinkError>>()?;

        Ok(Self {
            label: label.to_string(),
            node_count: stats.node_count,
            ticks: stats.ticks,
            capped: stats.capped,
            unknown_node_ratio: stats.unknown_node_ratio(),
            unknown_peer_ratio: stats.unknown_peer_ratio(),
            echoes_suppressed: stats.echoes_suppressed,
            latency: LatencyDistribution::from_latencies(messages.iter().map(|m| m.latency))?,
            total_duplicates: messages.iter().map(|m| m.duplicate_count).sum(),
            fully_propagated: messages.iter().filter(|m| m.reached_all).count(),
            messages,
        })
    }

    /// Look up one message's summary.
    pub fn message(&self, uuid: MessageUuid) -> Option<&MessageSummary> {
        self.messages.iter().find(|m| m.message_id == uuid)
    }

    pub fn print_summary(&self) {
        for message in &self.messages {
            message.print();
        }

        println!("=== Run {} ===", self.label);
        println!(
            "Nodes: {}, ticks: {}{}",
            self.node_count,
            self.ticks,
            if self.capped { " (tick cap reached)" } else { "" }
        );
        println!(
            "Messages: {}, fully propagated: {}, duplicates: {}",
            self.messages.len(),
            self.fully_propagated,
            self.total_duplicates
        );
        println!(
            "Latency p50: {}, p99: {}, max: {}, mean: {:.2}",
            self.latency.p50, self.latency.p99, self.latency.max, self.latency.mean
        );
        println!(
            "Unknown nodes: {:.4}, unknown peers: {:.4}, echoes suppressed: {}",
            self.unknown_node_ratio, self.unknown_peer_ratio, self.echoes_suppressed
        );
    }
}
