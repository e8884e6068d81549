//! Captured message log loader.
//!
//! The log is a JSON array of messages as recorded on the wire. A replay
//! keeps the messages created inside a time window and assigns each one to
//! the tick covering its creation time.

use super::open;
use crate::error::LoadError;
use gossipsim_simulation::BucketedSource;
use gossipsim_types::{Message, Tick};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// The slice of the log to replay and the width of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageWindow {
    /// Window start. `None` starts at the earliest message in the log.
    pub start: Option<SystemTime>,
    pub duration: Duration,
    pub tick_interval: Duration,
}

impl MessageWindow {
    pub fn new(duration: Duration, tick_interval: Duration) -> Self {
        Self {
            start: None,
            duration,
            tick_interval,
        }
    }

    pub fn with_start(mut self, start: SystemTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Offset of the window start from the unix epoch, given the log's
    /// earliest message for windows without an explicit start.
    fn start_offset(&self, earliest: Option<u64>) -> Result<Duration, LoadError> {
        match self.start {
            Some(start) => start
                .duration_since(UNIX_EPOCH)
                .map_err(|_| LoadError::InvalidWindow("start precedes the unix epoch".into())),
            None => Ok(Duration::from_secs(earliest.unwrap_or(0))),
        }
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.duration.is_zero() {
            return Err(LoadError::InvalidWindow("duration must be non-zero".into()));
        }
        if self.tick_interval.is_zero() {
            return Err(LoadError::InvalidWindow(
                "tick interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Tick for a message created `timestamp` seconds after the epoch, or
    /// `None` if it falls outside `[start, start + duration)`.
    fn tick_for(&self, start: Duration, timestamp: u64) -> Option<Tick> {
        let elapsed = Duration::from_secs(timestamp).checked_sub(start)?;
        if elapsed >= self.duration {
            return None;
        }
        let tick = elapsed.as_nanos() / self.tick_interval.as_nanos();
        Some(Tick(u64::try_from(tick).ok()?))
    }
}

/// Validate a decoded log and bucket the in-window messages by tick.
///
/// Messages without an origin and repeated uuids are rejected across the
/// whole log, not only inside the window. Within a tick, messages keep
/// creation order with the uuid as tie-break.
pub fn bucket_messages(
    mut messages: Vec<Message>,
    window: &MessageWindow,
) -> Result<BucketedSource, LoadError> {
    window.validate()?;

    let mut seen = HashSet::with_capacity(messages.len());
    for message in &messages {
        if message.origin_nodes.is_empty() {
            return Err(LoadError::NoOrigin(message.uuid));
        }
        if !seen.insert(message.uuid) {
            return Err(LoadError::DuplicateMessage(message.uuid));
        }
    }

    let total = messages.len();
    let start = window.start_offset(messages.iter().map(|m| m.timestamp.0).min())?;
    messages.sort_by_key(|m| (m.timestamp, m.uuid));

    let mut source = BucketedSource::new();
    for message in messages {
        match window.tick_for(start, message.timestamp.0) {
            Some(tick) => source.push(tick, message),
            None => debug!(uuid = %message.uuid, timestamp = %message.timestamp, "Message outside window"),
        }
    }

    info!(
        total,
        replayed = source.message_count(),
        buckets = source.bucket_count(),
        "Read message log"
    );
    Ok(source)
}

/// Decode a JSON message log and bucket it.
pub fn read_message_log(
    reader: impl Read,
    window: &MessageWindow,
) -> Result<BucketedSource, LoadError> {
    let messages: Vec<Message> = serde_json::from_reader(reader)?;
    bucket_messages(messages, window)
}

/// Read a JSON message log from disk and bucket it.
pub fn load_message_log(path: &Path, window: &MessageWindow) -> Result<BucketedSource, LoadError> {
    read_message_log(open(path)?, window)
}
