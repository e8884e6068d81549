//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key of a node in the topology (a hex-encoded public key in real
/// channel graphs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Create a node key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full pubkeys are 66 hex chars; keep log lines readable.
        match self.0.get(..16) {
            Some(prefix) if self.0.len() > 16 => write!(f, "{}..", prefix),
            _ => f.write_str(&self.0),
        }
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Simulation-wide unique message identifier.
///
/// Only used to key sighting records. The network itself deduplicates on
/// [`ProtocolId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageUuid(pub i64);

impl fmt::Display for MessageUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol-level identity of a gossiped object (e.g. a short channel id).
///
/// Two messages sharing a protocol id describe the same object; the one
/// with the later [`Timestamp`] supersedes the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(String);

impl ProtocolId {
    /// Create a protocol id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProtocolId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Discrete simulation step.
///
/// One tick is one synchronous exchange of pending messages between
/// directly connected nodes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    /// The first tick of a run.
    pub const ZERO: Self = Tick(0);

    /// Get the next tick.
    pub fn next(self) -> Self {
        Tick(self.0 + 1)
    }

    /// Signed distance from `earlier` to `self`.
    ///
    /// Negative when `earlier` is actually later; callers treat that as a
    /// consistency violation rather than clamping.
    pub fn ticks_since(self, earlier: Tick) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

/// Logical creation time of a message, in unix seconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Whether this timestamp is strictly older than `other`.
    pub fn is_before(self, other: Timestamp) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
