//! Labelled in-memory sighting store.

use dashmap::DashMap;
use gossipsim_core::{EventSink, SightingRecord, SinkError};
use gossipsim_types::{MessageUuid, NodeKey, Tick};
use parking_lot::RwLock;
use std::collections::{btree_map, hash_map};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

/// Rows of a single run: message -> node -> record.
///
/// The outer `DashMap` entry lock makes each upsert atomic for its message,
/// so concurrent callers hitting the same (message, node) still produce one
/// row.
#[derive(Debug, Default)]
pub(crate) struct RunStore {
    rows: DashMap<MessageUuid, BTreeMap<NodeKey, SightingRecord>>,
}

impl RunStore {
    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a restored row verbatim.
    pub(crate) fn restore(&self, record: SightingRecord) -> Result<(), SinkError> {
        let mut nodes = self.rows.entry(record.uuid).or_default();
        match nodes.entry(record.node.clone()) {
            btree_map::Entry::Occupied(_) => Err(SinkError::Persistence(format!(
                "duplicate row for message {} at {}",
                record.uuid, record.node
            ))),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    pub(crate) fn all_rows(&self) -> Vec<SightingRecord> {
        let mut rows: Vec<SightingRecord> = self
            .rows
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect();
        rows.sort_by(|a, b| (a.uuid, &a.node).cmp(&(b.uuid, &b.node)));
        rows
    }
}

/// A store of sighting rows partitioned by run label.
#[derive(Debug, Default)]
pub struct SightingDb {
    runs: RwLock<HashMap<String, Arc<RunStore>>>,
}

impl SightingDb {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a run for writing.
    ///
    /// Fails with [`SinkError::RunLabelInUse`] if the label was opened
    /// before or restored with rows, even if that run is still empty.
    pub fn open_run(&self, label: &str) -> Result<RunSightings, SinkError> {
        let mut runs = self.runs.write();
        let store = match runs.entry(label.to_string()) {
            hash_map::Entry::Occupied(_) => {
                return Err(SinkError::RunLabelInUse(label.to_string()))
            }
            hash_map::Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::default())),
        };

        debug!(label, "Opened sighting run");
        Ok(RunSightings {
            label: label.to_string(),
            store,
        })
    }

    /// Read-only handle on an existing run, e.g. to re-analyze restored data.
    pub fn run(&self, label: &str) -> Option<RunSightings> {
        self.runs.read().get(label).map(|store| RunSightings {
            label: label.to_string(),
            store: Arc::clone(store),
        })
    }

    /// Labels that have at least one row, sorted.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .runs
            .read()
            .iter()
            .filter(|(_, store)| !store.is_empty())
            .map(|(label, _)| label.clone())
            .collect();
        labels.sort();
        labels
    }

    pub(crate) fn store_for(&self, label: &str) -> Arc<RunStore> {
        Arc::clone(self.runs.write().entry(label.to_string()).or_default())
    }
}

/// Sink handle for one labelled run.
#[derive(Debug, Clone)]
pub struct RunSightings {
    label: String,
    store: Arc<RunStore>,
}

impl RunSightings {
    /// The run label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Total number of (message, node) rows.
    pub fn row_count(&self) -> usize {
        self.store.rows.iter().map(|entry| entry.value().len()).sum()
    }

    /// Every row, ordered by message then node.
    pub fn rows(&self) -> Vec<SightingRecord> {
        self.store.all_rows()
    }
}

impl EventSink for RunSightings {
    fn record_sighting(
        &self,
        uuid: MessageUuid,
        node: &NodeKey,
        tick: Tick,
    ) -> Result<(), SinkError> {
        let mut nodes = self.store.rows.entry(uuid).or_default();
        match nodes.entry(node.clone()) {
            btree_map::Entry::Occupied(mut row) => row.get_mut().observe(tick)?,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(SightingRecord::first(uuid, node.clone(), tick));
            }
        }
        trace!(label = %self.label, %uuid, %node, %tick, "Recorded sighting");
        Ok(())
    }

    fn sightings(&self, uuid: MessageUuid) -> Result<Vec<SightingRecord>, SinkError> {
        match self.store.rows.get(&uuid) {
            Some(nodes) => Ok(nodes.values().cloned().collect()),
            None => Err(SinkError::UnknownMessage(uuid)),
        }
    }

    fn distinct_message_ids(&self) -> Vec<MessageUuid> {
        let mut ids: Vec<MessageUuid> = self.store.rows.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}
