//! Flood-routing gossip node.
//!
//! [`FloodNode`] relays every new or newer message to all of its peers
//! except the ones it already received that version from.

mod flood;

pub use flood::FloodNode;
