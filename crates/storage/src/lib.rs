//! # Sighting Storage
//!
//! In-memory implementation of the [`EventSink`](gossipsim_core::EventSink)
//! contract.
//!
//! A [`SightingDb`] holds any number of labelled runs. Each run is opened
//! once through [`SightingDb::open_run`], which refuses labels that were
//! already opened or carry restored data, so two simulations never mix rows. The returned
//! [`RunSightings`] handle is the sink the simulation writes to and the
//! analytics read from.
//!
//! Rows can be saved to and restored from a JSON-lines file (one labelled
//! row per line), which is how label uniqueness is kept across processes.

mod memory;
mod persist;

pub use memory::{RunSightings, SightingDb};
pub use persist::PersistedSighting;
