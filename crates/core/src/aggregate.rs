//! Propagation statistics over a message's sighting rows.
//!
//! These are the definitions every [`EventSink`](crate::EventSink) must
//! agree with, whatever its storage. All latencies are measured on
//! first-seen ticks; last-seen only matters for duplicates.
//!
//! A negative per-node latency means the rows contradict the rule that no
//! node sees a message before its first network contact. That is reported
//! as [`SinkError::NegativeLatency`], never clamped.

use crate::{SightingRecord, SinkError};
use gossipsim_types::{MessageUuid, Tick};

/// Earliest first-seen tick across all rows.
pub fn earliest_first_seen(uuid: MessageUuid, rows: &[SightingRecord]) -> Result<Tick, SinkError> {
    rows.iter()
        .map(|r| r.first_seen)
        .min()
        .ok_or(SinkError::UnknownMessage(uuid))
}

/// Each row's first-seen latency relative to `origin`.
fn node_latencies(
    uuid: MessageUuid,
    rows: &[SightingRecord],
    origin: Tick,
) -> Result<Vec<u64>, SinkError> {
    rows.iter()
        .map(|r| {
            let latency = r.first_seen.ticks_since(origin);
            if latency < 0 {
                return Err(SinkError::NegativeLatency {
                    uuid,
                    node: r.node.clone(),
                    latency,
                });
            }
            Ok(latency as u64)
        })
        .collect()
}

/// Span between the earliest and the latest first contact.
///
/// A message only its origin saw has zero latency.
pub fn latency(uuid: MessageUuid, rows: &[SightingRecord]) -> Result<u64, SinkError> {
    let origin = earliest_first_seen(uuid, rows)?;
    Ok(node_latencies(uuid, rows, origin)?
        .into_iter()
        .max()
        .unwrap_or(0))
}

/// Span from a known injection tick to the latest first contact.
pub fn latency_since(
    uuid: MessageUuid,
    rows: &[SightingRecord],
    expected_first: Tick,
) -> Result<u64, SinkError> {
    if rows.is_empty() {
        return Err(SinkError::UnknownMessage(uuid));
    }
    if let Some(early) = rows.iter().find(|r| r.first_seen < expected_first) {
        return Err(SinkError::UnexpectedFirstSeen {
            uuid,
            node: early.node.clone(),
            first_seen: early.first_seen,
            expected: expected_first,
        });
    }
    Ok(node_latencies(uuid, rows, expected_first)?
        .into_iter()
        .max()
        .unwrap_or(0))
}

/// Mean first-contact latency, excluding the origin from the denominator.
///
/// The origin's own zero stays in the sum; the sum is divided by
/// `recipients - 1`. With a single recipient the raw span is returned
/// undivided.
pub fn average_latency(uuid: MessageUuid, rows: &[SightingRecord]) -> Result<f64, SinkError> {
    let origin = earliest_first_seen(uuid, rows)?;
    let latencies = node_latencies(uuid, rows, origin)?;
    let total: u64 = latencies.iter().sum();

    if latencies.len() == 1 {
        return Ok(total as f64);
    }
    Ok(total as f64 / (latencies.len() - 1) as f64)
}

/// Sum over nodes of `seen_count - 1`.
pub fn duplicate_count(rows: &[SightingRecord]) -> u64 {
    rows.iter().map(|r| r.seen_count.saturating_sub(1)).sum()
}

/// Number of nodes whose seen count exceeds `threshold`.
///
/// Threshold 0 is the total number of recipients.
pub fn duplicate_bucket(rows: &[SightingRecord], threshold: u64) -> u64 {
    rows.iter().filter(|r| r.seen_count > threshold).count() as u64
}
